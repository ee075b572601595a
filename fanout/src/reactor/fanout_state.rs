// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{Console, RuntimeOptions, Session, SessionEnv, SessionId, SessionRegistry};

/// Everything the reactor thread owns besides the poll machinery. Control commands and
/// input handling operate on this.
#[allow(missing_debug_implementations)]
pub struct FanoutState {
    pub registry: SessionRegistry,
    pub console: Console,
    pub options: RuntimeOptions,
    /// Set by `:hide_password`: the next line is not shown while typed and is kept out
    /// of the history.
    pub mask_next_input: bool,
}

impl FanoutState {
    #[must_use]
    pub fn new(registry: SessionRegistry, console: Console, options: RuntimeOptions) -> Self {
        Self {
            registry,
            console,
            options,
            mask_next_input: false,
        }
    }

    pub fn output(&mut self, msg: &[u8]) { self.console.output(msg); }

    pub fn with_session<R>(
        &mut self,
        id: SessionId,
        f: impl FnOnce(&mut Session, &mut SessionEnv<'_>) -> R,
    ) -> Option<R> {
        self.registry
            .with_session(id, &mut self.console, &mut self.options, f)
    }

    pub fn for_each_session(
        &mut self,
        ids: &[SessionId],
        f: impl FnMut(&mut Session, &mut SessionEnv<'_>),
    ) {
        self.registry
            .for_each_session(ids, &mut self.console, &mut self.options, f);
    }

    /// See [`SessionRegistry::select`].
    pub fn select(&mut self, patterns: &str) -> Vec<SessionId> {
        self.registry.select(patterns, &mut self.console)
    }

    /// Ids of the enabled sessions, ordered by display name.
    #[must_use]
    pub fn enabled_ids(&self) -> Vec<SessionId> {
        self.registry
            .all_sessions()
            .iter()
            .filter(|session| session.is_enabled())
            .map(|session| session.id())
            .collect()
    }

    /// An exit asked for by a session (abort on error) or by the console (the log file
    /// failed). The first one wins.
    pub fn take_exit_request(&mut self) -> Option<i32> {
        let from_options = self.options.take_exit_request();
        let from_console = self.console.take_exit_request();
        from_options.or(from_console)
    }
}
