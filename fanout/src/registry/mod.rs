// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The set of live sessions: creation from host arguments, unique display names,
//! selection by pattern, and the terminal size pushed to every remote shell.

// Attach sources.
pub mod display_names;
pub mod host_syntax;
pub mod session_registry;

// Re-export.
pub use display_names::*;
pub use host_syntax::*;
pub use session_registry::*;
