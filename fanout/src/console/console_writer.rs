// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::InputBridge;
use std::{fs::{File, OpenOptions},
          io::{self, Write},
          path::{Path, PathBuf}};

/// Moves the cursor back to the line the editor left when `readline()` returned.
const CURSOR_UP: &[u8] = b"\x1b[1A";

/// The conversation log: everything shown, without colors, plus the typed lines.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: File,
}

impl LogFile {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// If the file can't be opened.
    pub fn open_append(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }
}

/// Everything shown on the local terminal goes through here.
///
/// In interactive mode, the status line (the prompt of the line editor) is cleared
/// before printing, and the editor is first taken out of `readline()` so it does not
/// redraw over the output.
#[allow(missing_debug_implementations)]
pub struct Console {
    writer: Box<dyn Write>,
    log_file: Option<LogFile>,
    interactive: bool,
    last_status_length: usize,
    input_bridge: Option<InputBridge>,
    exit_request: Option<i32>,
}

impl Console {
    #[must_use]
    pub fn stdout(interactive: bool) -> Self { Self::with_writer(Box::new(io::stdout()), interactive) }

    #[must_use]
    pub fn with_writer(writer: Box<dyn Write>, interactive: bool) -> Self {
        Self {
            writer,
            log_file: None,
            interactive,
            last_status_length: 0,
            input_bridge: None,
            exit_request: None,
        }
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool { self.interactive }

    /// Prints `msg` and logs it.
    pub fn output(&mut self, msg: &[u8]) { self.output_logged(msg, msg); }

    /// Prints `msg`, logs `log_msg`. An empty `msg` still clears the status line.
    pub fn output_logged(&mut self, msg: &[u8], log_msg: &[u8]) {
        self.log(log_msg);
        if self.interactive {
            self.interrupt_input();
            if self.last_status_length > 0 {
                let mut clear = Vec::with_capacity(self.last_status_length + 2);
                clear.push(b'\r');
                clear.resize(self.last_status_length + 1, b' ');
                clear.push(b'\r');
                self.write_out(&clear);
                self.last_status_length = 0;
            }
        }
        self.write_out(msg);
    }

    /// Transient text that is neither logged nor clears the status line, like the
    /// `Started 3/10 remote processes` progress.
    pub fn output_unlogged(&mut self, msg: &[u8]) { self.write_out(msg); }

    /// Writes to the log file only. A failing log file asks the process to exit.
    pub fn log(&mut self, msg: &[u8]) {
        if msg.is_empty() {
            return;
        }
        let Some(log_file) = &mut self.log_file else {
            return;
        };
        if let Err(err) = log_file.file.write_all(msg) {
            let report = format!(
                "Failed to write to the log file {}: {err}\n",
                log_file.path.display()
            );
            self.log_file = None;
            self.write_out(report.as_bytes());
            self.exit_request.get_or_insert(1);
        }
    }

    /// Length of the prompt just shown, erased before the next output.
    pub fn set_last_status_length(&mut self, length: usize) { self.last_status_length = length; }

    #[must_use]
    pub fn log_file(&self) -> Option<&LogFile> { self.log_file.as_ref() }

    /// Returns the previous log file.
    pub fn set_log_file(&mut self, log_file: Option<LogFile>) -> Option<LogFile> {
        std::mem::replace(&mut self.log_file, log_file)
    }

    pub fn attach_input_bridge(&mut self, bridge: InputBridge) { self.input_bridge = Some(bridge); }

    pub fn input_bridge_mut(&mut self) -> Option<&mut InputBridge> { self.input_bridge.as_mut() }

    pub fn take_input_bridge(&mut self) -> Option<InputBridge> { self.input_bridge.take() }

    pub fn take_exit_request(&mut self) -> Option<i32> { self.exit_request.take() }

    fn interrupt_input(&mut self) {
        let Some(bridge) = &mut self.input_bridge else {
            return;
        };
        if let Some(displayed_width) = bridge.interrupt_readline() {
            self.write_out(CURSOR_UP);
            self.last_status_length = self.last_status_length.max(displayed_width);
        }
    }

    /// `write_all` retries on `EINTR`.
    fn write_out(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let result = self
            .writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush());
        if let Err(err) = result {
            tracing::warn!(message = "failed to write to the console", ?err);
        }
    }
}
