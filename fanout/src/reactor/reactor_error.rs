// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::io;

/// The reactor could not be set up. Fatal: reported by `main()` before any shell is
/// started.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ReactorSetupError {
    #[error("Failed to create the poll instance")]
    #[diagnostic(
        code(r3bl_fanout::reactor::poll),
        help("Check the limit on open file descriptors (ulimit -n)")
    )]
    CreatePoll(#[source] io::Error),

    #[error("Failed to create the waker for the input thread")]
    #[diagnostic(code(r3bl_fanout::reactor::waker))]
    CreateWaker(#[source] io::Error),

    #[error("Failed to install the SIGINT, SIGTSTP and SIGWINCH handlers")]
    #[diagnostic(code(r3bl_fanout::reactor::signals))]
    CreateSignals(#[source] io::Error),

    #[error("Failed to register the signal pipe with the poll instance")]
    #[diagnostic(code(r3bl_fanout::reactor::register))]
    RegisterSignals(#[source] io::Error),
}
