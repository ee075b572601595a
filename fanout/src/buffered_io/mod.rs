// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Non-blocking byte buffering for one pseudo-terminal master (or anything else that is
//! [`std::io::Read`] + [`std::io::Write`]).
//!
//! Both directions are capped at [`MAX_BUFFER_SIZE`]. Reading stops at the cap, writing
//! past it is a [`BufferOverflowError`].

// Attach sources.
pub mod buffer_overflow_error;
pub mod byte_buffer_channel;

// Re-export.
pub use buffer_overflow_error::*;
pub use byte_buffer_channel::*;
