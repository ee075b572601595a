// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use strum_macros::{Display, IntoStaticStr};

/// Identity of a session for its whole life, independent of its (changeable) display
/// name. Also used to derive the [`mio::Token`] of its pty master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub usize);

/// Where a remote shell is in its life.
///
/// ```text
///               prompt marker (interactive)
///  NotStarted ─────────────────────────────────► Idle ◄─────────────┐
///      │                                           │                │
///      │ prompt marker (non-interactive),          │ command sent   │ prompt marker
///      │ the command is sent                       ▼                │
///      └─────────────────────────────────────► Running ─────────────┘
///
///  Idle, Running ──── termination marker ────► Terminated
///  any state ──── child exit, fatal I/O, overflow ────► Dead (absorbing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Spawned, the prompt marker was not seen yet (ssh is connecting, asking for a
    /// password, or the init string is not processed yet).
    NotStarted,
    /// At the prompt, waiting for a command.
    Idle,
    /// A command was sent and its prompt did not come back yet.
    Running,
    /// The termination marker was echoed, the shell is exiting.
    Terminated,
    /// Disconnected. Nothing is read from or written to it anymore.
    Dead,
}

/// What a trigger means when it fires. Stored in the [`crate::TriggerRegistry`] in
/// place of a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// The prompt set by the init string.
    SeenPrompt,
    /// The prompt installed in non-interactive mode once the command is sent. Ignored.
    RealPromptEnds,
    /// The payload is the shell-expanded new display name.
    Rename,
    /// The command of a non-interactive session completed.
    Terminated,
}

/// Callback type of the trigger registry shared by every session. Carries its owner so
/// a marker echoed by another shell is still routed to the right session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTrigger {
    pub owner: SessionId,
    pub action: TriggerAction,
}
