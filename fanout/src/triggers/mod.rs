// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! In-band markers used to notice shell events (prompt shown, rename echoed, command
//! done) in the plain text coming back from a remote shell.

// Attach sources.
pub mod trigger_registry;

// Re-export.
pub use trigger_registry::*;
