// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Which registered source a [`mio::Token`] belongs to.

use crate::SessionId;
use mio::{Interest, Token};

/// Tokens below this one belong to the reactor's own sources.
pub const SESSION_TOKEN_OFFSET: usize = 2;

/// Identifies which event source became ready.
///
/// This enum is the single source of truth for the [`Token`] ↔ source mapping. Every
/// session gets the token of its [`SessionId`] shifted by [`SESSION_TOKEN_OFFSET`], so
/// ids are never reused for a token while the session is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKindReady {
    /// The input bridge has events (the [`mio::Waker`] handed to it fired).
    Waker,
    /// `SIGINT`, `SIGTSTP` or `SIGWINCH` arrived.
    Signals,
    /// The pty master of a session.
    Session(SessionId),
}

impl SourceKindReady {
    #[must_use]
    pub const fn to_token(self) -> Token {
        match self {
            Self::Waker => Token(0),
            Self::Signals => Token(1),
            Self::Session(id) => Token(id.0 + SESSION_TOKEN_OFFSET),
        }
    }

    #[must_use]
    pub const fn from_token(token: Token) -> Self {
        match token.0 {
            0 => Self::Waker,
            1 => Self::Signals,
            n => Self::Session(SessionId(n - SESSION_TOKEN_OFFSET)),
        }
    }
}

/// The interest a pty master is registered with, `None` if it must not be polled.
#[must_use]
pub const fn interest_for(read_ready: bool, write_ready: bool) -> Option<Interest> {
    match (read_ready, write_ready) {
        (true, true) => Some(Interest::READABLE.add(Interest::WRITABLE)),
        (true, false) => Some(Interest::READABLE),
        (false, true) => Some(Interest::WRITABLE),
        (false, false) => None,
    }
}
