// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Diagnostic tracing for `fanout` itself.
//!
//! This is not the conversation log (`--log-file`, `:set_log`), which records what the
//! remote shells printed and is written by [`crate::Console`]. Tracing output never goes
//! to the terminal, since the console owns stdout and the line editor owns the tty.

// Attach sources.
pub mod custom_event_formatter;
pub mod rolling_file_appender_impl;
pub mod tracing_config;
pub mod tracing_init;

// Re-export.
pub use custom_event_formatter::*;
pub use tracing_config::*;
pub use tracing_init::*;
