// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Pty master registrations and readiness events.

use super::{Reactor, Readiness, SourceKindReady, fanout_reactor::DEBUG_REACTOR, interest_for};
use crate::{FanoutState, SessionId};
use mio::unix::SourceFd;

impl Reactor {
    /// Brings the registrations in line with the sessions: new pty masters are
    /// registered, and the interest of the others follows whether their buffers can take
    /// a read or have something to write. Dead sessions are not polled.
    ///
    /// Sessions removed from the registry closed their pty master, which took it out of
    /// the poll set, so they are only forgotten here.
    pub(super) fn sync_interests(&mut self, state: &FanoutState) {
        self.interests
            .retain(|id, _| state.registry.get(*id).is_some());

        let registry = self.poll.registry();
        for session in state.registry.iter() {
            let Some(fd) = session.raw_fd() else {
                continue;
            };
            let id = session.id();
            let token = SourceKindReady::Session(id).to_token();
            let current = self.interests.get(&id).copied();
            let wanted = interest_for(session.is_read_ready(), session.is_write_ready());

            let result = match (current, wanted) {
                (None, None) => continue,
                (Some(current), Some(wanted)) if current == wanted => continue,
                (None, Some(wanted)) => registry.register(&mut SourceFd(&fd), token, wanted),
                (Some(_), Some(wanted)) => registry.reregister(&mut SourceFd(&fd), token, wanted),
                (Some(_), None) => registry.deregister(&mut SourceFd(&fd)),
            };

            DEBUG_REACTOR.then(|| {
                tracing::debug!(message = "interest", name = session.display_name(), ?current, ?wanted);
            });
            match result {
                Ok(()) => match wanted {
                    Some(wanted) => {
                        self.interests.insert(id, wanted);
                    }
                    None => {
                        self.interests.remove(&id);
                    }
                },
                Err(err) => {
                    tracing::warn!(message = "failed to update registration", name = session.display_name(), ?err);
                    self.interests.remove(&id);
                }
            }
        }
    }

    /// Returns `true` if the session was read from.
    pub(super) fn handle_session_event(
        state: &mut FanoutState,
        id: SessionId,
        readiness: Readiness,
    ) -> bool {
        state
            .with_session(id, |session, env| {
                let mut read = false;
                if readiness.readable && session.is_read_ready() {
                    session.handle_read(env);
                    read = true;
                }
                if readiness.writable && session.is_write_ready() {
                    session.handle_write(env);
                }
                read
            })
            .unwrap_or(false)
    }
}
