// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! What happens to a line typed at the prompt: `:` control commands, `!` local
//! commands, and everything else broadcast to the shells.

// Attach sources.
pub mod control_command_error;
pub mod control_command_table;
mod handlers;
pub mod process_input;

// Re-export.
pub use control_command_error::*;
pub use control_command_table::*;
pub use handlers::toggle_shells;
pub use process_input::*;
