// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;

/// Problems with the command line found before any shell is started.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read the hosts file {path:?}")]
    #[diagnostic(code(r3bl_fanout::config::hosts_file))]
    HostsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No hosts given")]
    #[diagnostic(
        code(r3bl_fanout::config::no_hosts),
        help("Pass hosts as arguments or with --hosts-file")
    )]
    NoHosts,

    #[error("--command and reading from stdin are incompatible")]
    #[diagnostic(code(r3bl_fanout::config::command_and_stdin))]
    CommandAndStdin,

    #[error("Failed to read the command from stdin")]
    #[diagnostic(code(r3bl_fanout::config::stdin))]
    ReadStdin(#[source] std::io::Error),

    #[error("Failed to read the password from {path:?}")]
    #[diagnostic(code(r3bl_fanout::config::password))]
    Password {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open the log file {path:?}")]
    #[diagnostic(code(r3bl_fanout::config::log_file))]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
