// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{Console, RuntimeOptions, SessionRegistry};

/// Enough rounds for a stub shell to go from its greeting to a command's prompt.
pub const PUMP_ROUNDS: usize = 20;

/// Flushes and reads every session a few times, the way the reactor would if every pty
/// master was always readable and writable.
pub fn pump_registry(
    registry: &mut SessionRegistry,
    console: &mut Console,
    options: &mut RuntimeOptions,
) {
    for _ in 0..PUMP_ROUNDS {
        for id in registry.all_ids() {
            registry.with_session(id, console, options, |session, env| {
                session.handle_write(env);
                session.handle_read(env);
                session.handle_write(env);
            });
        }
    }
}
