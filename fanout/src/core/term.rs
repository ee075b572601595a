// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Local terminal queries using rustix's safe termios API.

use rustix::termios::{self, OptionalActions, Termios};
use std::io;

/// Used when no terminal can be asked and `$COLUMNS` / `$LINES` are not set.
pub const DEFAULT_TERM_SIZE: TermSize = TermSize { cols: 80, rows: 25 };

/// Size of a terminal, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self { Self { cols, rows } }
}

/// Get the size of the local terminal.
///
/// Asks stdin, stdout and stderr in turn, then falls back to `$COLUMNS` / `$LINES`, and
/// finally to [`DEFAULT_TERM_SIZE`]. Never fails, since a console whose output is piped
/// still has to pick *some* width for the remote shells.
#[must_use]
pub fn get_terminal_size() -> TermSize {
    let from_fds = [
        termios::tcgetwinsize(io::stdin()),
        termios::tcgetwinsize(io::stdout()),
        termios::tcgetwinsize(io::stderr()),
    ]
    .into_iter()
    .flatten()
    .find(|winsize| winsize.ws_col > 0 && winsize.ws_row > 0)
    .map(|winsize| TermSize::new(winsize.ws_col, winsize.ws_row));

    from_fds
        .or_else(term_size_from_env)
        .unwrap_or(DEFAULT_TERM_SIZE)
}

/// Width of the terminal attached to stdout, if there is one.
#[must_use]
pub fn get_terminal_width() -> Option<u16> {
    termios::tcgetwinsize(io::stdout())
        .ok()
        .map(|winsize| winsize.ws_col)
        .filter(|cols| *cols > 0)
}

fn term_size_from_env() -> Option<TermSize> {
    let cols = std::env::var("COLUMNS").ok()?.trim().parse().ok()?;
    let rows = std::env::var("LINES").ok()?.trim().parse().ok()?;
    Some(TermSize::new(cols, rows))
}

#[must_use]
pub fn is_stdin_tty() -> bool { termios::isatty(io::stdin()) }

#[must_use]
pub fn is_stdout_tty() -> bool { termios::isatty(io::stdout()) }

/// Terminal attributes of stdin captured at startup, put back on exit.
///
/// The line editor switches the terminal to raw mode while it waits for input. If the
/// process exits while the editor is blocked (every shell terminated, `:quit` typed in
/// another way, abort on error), nothing else would restore cooked mode.
#[allow(missing_debug_implementations)]
pub struct SavedStdinAttributes {
    original: Option<Termios>,
}

impl SavedStdinAttributes {
    /// Captures the current attributes. Captures nothing when stdin is not a tty.
    #[must_use]
    pub fn capture() -> Self {
        let original = if is_stdin_tty() {
            termios::tcgetattr(io::stdin()).ok()
        } else {
            None
        };
        Self { original }
    }

    /// Puts the captured attributes back, waiting for pending output to drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal attributes cannot be set.
    pub fn restore(&self) -> miette::Result<()> {
        if let Some(termios) = &self.original {
            termios::tcsetattr(io::stdin(), OptionalActions::Drain, termios)
                .map_err(|e| miette::miette!("failed to restore terminal attributes: {e}"))?;
        }
        Ok(())
    }
}

impl Drop for SavedStdinAttributes {
    fn drop(&mut self) { self.restore().ok(); }
}
