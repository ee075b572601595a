// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! In-memory stand-ins for pty masters and remote shells, and helpers that pump a
//! [`crate::SessionRegistry`] without a [`mio::Poll`].

// Attach.
pub mod captured_output;
pub mod scripted_io;
pub mod stub_shell;
pub mod test_harness;

// Re-export.
pub use captured_output::*;
pub use scripted_io::*;
pub use stub_shell::*;
pub use test_harness::*;
