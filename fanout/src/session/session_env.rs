// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{Console, DisplayNames, FiredTrigger, RuntimeOptions, SessionTrigger,
            TriggerRegistry};

/// Everything a [`crate::Session`] needs from its owner while it handles one event.
///
/// The registry lends its shared state for the duration of a single call, so sessions
/// never hold references to each other or to the registry.
#[allow(missing_debug_implementations)]
pub struct SessionEnv<'a> {
    pub console: &'a mut Console,
    pub options: &'a mut RuntimeOptions,
    pub triggers: &'a mut TriggerRegistry<SessionTrigger>,
    pub names: &'a mut DisplayNames,
    /// Markers found in this session's output that belong to another session. The
    /// registry hands them to their owner once the call returns.
    pub foreign_triggers: Vec<FiredTrigger<SessionTrigger>>,
}

impl<'a> SessionEnv<'a> {
    pub fn new(
        console: &'a mut Console,
        options: &'a mut RuntimeOptions,
        triggers: &'a mut TriggerRegistry<SessionTrigger>,
        names: &'a mut DisplayNames,
    ) -> Self {
        Self {
            console,
            options,
            triggers,
            names,
            foreign_triggers: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool { self.options.interactive }
}
