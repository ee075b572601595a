// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{io, path::PathBuf};

/// A control command that could not do what it was asked. Printed on the console, never
/// fatal.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ControlCommandError {
    #[error("Unknown control command: {0}")]
    #[diagnostic(
        code(r3bl_fanout::control_commands::unknown),
        help("Press TAB after `:` to list the control commands")
    )]
    Unknown(String),

    #[error("Expected at least a letter")]
    #[diagnostic(code(r3bl_fanout::control_commands::missing_letter))]
    MissingLetter,

    #[error("Expected a single letter, got: {0}")]
    #[diagnostic(code(r3bl_fanout::control_commands::not_a_letter))]
    NotASingleLetter(String),

    #[error("Expected 'y' or 'n', got: {0}")]
    #[diagnostic(code(r3bl_fanout::control_commands::not_yes_or_no))]
    NotYesOrNo(String),

    #[error("{}: {source}", path.display())]
    #[diagnostic(code(r3bl_fanout::control_commands::chdir))]
    ChangeDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    #[diagnostic(code(r3bl_fanout::control_commands::set_log))]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to run {command}: {source}")]
    #[diagnostic(code(r3bl_fanout::control_commands::local_command))]
    LocalCommand {
        command: String,
        #[source]
        source: io::Error,
    },
}
