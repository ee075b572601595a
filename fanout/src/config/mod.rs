// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Command line arguments, what they resolve to at startup ([`LaunchConfig`]), and the
//! options that control commands may change while running ([`RuntimeOptions`]).

// Attach sources.
pub mod cli_arg;
pub mod config_error;
pub mod launch_config;
pub mod runtime_options;

// Re-export.
pub use cli_arg::*;
pub use config_error::*;
pub use launch_config::*;
pub use runtime_options::*;
