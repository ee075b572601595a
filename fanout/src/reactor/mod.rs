// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactor: one [`mio::Poll`] over every pty master, the signal pipe and the
//! waker of the input bridge. All session state is touched from this thread only.

// Attach sources.
pub mod fanout_reactor;
pub mod fanout_state;
pub mod handler_bridge;
pub mod handler_sessions;
pub mod handler_signals;
pub mod reactor_error;
pub mod sources;

// Re-export.
pub use fanout_reactor::*;
pub use fanout_state::*;
pub use handler_bridge::*;
pub use handler_signals::*;
pub use reactor_error::*;
pub use sources::*;
