// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for the input bridge thread loop.
///
/// [`LoopControl`] is the reactor's counterpart, which also has to carry an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/thread.
    Stop,
}

/// Control flow result returned up through the reactor's iteration functions.
///
/// Nothing in the reactor unwinds to leave the loop. A handler that wants the process
/// to end (`:quit`, "abort on error", every shell terminated, a failing log file)
/// returns [`LoopControl::Exit`] and the loop returns that code to `main()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopControl {
    /// Keep running the reactor.
    #[default]
    Continue,

    /// Leave the reactor and exit the process with this code.
    Exit(i32),
}

impl LoopControl {
    /// Keeps the first exit request: once something asked to exit, later requests do
    /// not override its code.
    #[must_use]
    pub fn and_then(self, other: LoopControl) -> LoopControl {
        match self {
            LoopControl::Exit(_) => self,
            LoopControl::Continue => other,
        }
    }

    #[must_use]
    pub fn is_exit(self) -> bool { matches!(self, LoopControl::Exit(_)) }
}
