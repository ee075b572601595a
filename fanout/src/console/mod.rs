// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The local terminal: merged output of all shells, the status line, and the
//! conversation log.

// Attach sources.
pub mod console_writer;
pub mod prefix_colors;

// Re-export.
pub use console_writer::*;
pub use prefix_colors::*;
