// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Starting the local child process of a session failed.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SpawnError {
    #[error("Failed to open a pty for {host}: {message}")]
    #[diagnostic(
        code(r3bl_fanout::session::open_pty),
        help("This usually means the system ran out of ptys or file descriptors")
    )]
    OpenPty { host: String, message: String },

    #[error("Failed to start `{command}` for {host}: {message}")]
    #[diagnostic(
        code(r3bl_fanout::session::spawn_command),
        help("Check the --ssh template, `/bin/sh` must be able to run it")
    )]
    SpawnCommand {
        host: String,
        command: String,
        message: String,
    },

    #[error("Failed to configure the pty of {host}")]
    #[diagnostic(code(r3bl_fanout::session::configure_pty))]
    ConfigurePty {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to get the current directory")]
    #[diagnostic(code(r3bl_fanout::session::current_dir))]
    CurrentDir(#[source] std::io::Error),
}
