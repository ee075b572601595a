// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One remote shell per [`Session`]: a pty master wrapped in a
//! [`crate::ByteBufferChannel`], and the state machine that frames its output.

// Attach sources.
pub mod pty_shell_transport;
pub mod remote_session;
pub mod session_env;
pub mod session_errors;
pub mod session_read_path;
pub mod session_state;
pub mod shell_init;
pub mod shell_transport;

// Re-export.
pub use pty_shell_transport::*;
pub use remote_session::*;
pub use session_env::*;
pub use session_errors::*;
pub use session_state::*;
pub use shell_init::*;
pub use shell_transport::*;
