// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::DEFAULT_SSH_TEMPLATE;
use clap::Parser;
use std::path::PathBuf;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "fanout")]
#[command(about = "Run commands on many remote shells at once, over ssh")]
#[command(version)]
#[command(next_line_help = true)]
/// More info: <https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template>
#[command(
    help_template = "{about}\nVersion: {bin} {version}\n\nUSAGE:\n  fanout [\x1b[34moptions\x1b[0m] [\x1b[32mhosts\x1b[0m]...\n\nHosts accept ranges like `web<1-3>` and ports like `db:2222`.\nControl commands are prefixed by `:`, local commands by `!`.\n\n{all-args}\n"
)]
pub struct CLIArg {
    #[arg(value_name = "HOSTS", help = "Hosts to connect to, `host[:port]`")]
    pub host_names: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Read hostnames from the given file, one per line (repeatable)"
    )]
    pub hosts_file: Vec<PathBuf>,

    #[arg(
        long,
        value_name = "CMD",
        help = "Command to execute on the remote shells, then exit"
    )]
    pub command: Option<String>,

    #[arg(
        long,
        value_name = "SSH",
        default_value = DEFAULT_SSH_TEMPLATE,
        help = "ssh command to use, `{host}` and `{port}` are substituted"
    )]
    pub ssh: String,

    #[arg(long, value_name = "USER", help = "Remote user to log in as")]
    pub user: Option<String>,

    #[arg(long, help = "Disable colored hostnames")]
    pub no_color: bool,

    #[arg(
        long,
        value_name = "FILE",
        help = "Read a password from the given file, `-` asks on the tty"
    )]
    pub password_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Append each machine conversation to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Abort if some shell fails to initialize")]
    pub abort_errors: bool,

    #[arg(long, help = "Print debugging information")]
    pub debug: bool,

    #[arg(
        long,
        value_name = "FILE",
        help = "Write diagnostic tracing for fanout itself to this file"
    )]
    pub trace_log: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_command_line() {
        let arg = CLIArg::try_parse_from([
            "fanout",
            "--hosts-file",
            "a.txt",
            "--hosts-file",
            "b.txt",
            "--user",
            "root",
            "--no-color",
            "--abort-errors",
            "web<1-2>",
            "db:2222",
        ])
        .unwrap();

        assert_eq!(arg.host_names, vec!["web<1-2>", "db:2222"]);
        assert_eq!(arg.hosts_file, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(arg.user.as_deref(), Some("root"));
        assert_eq!(arg.ssh, DEFAULT_SSH_TEMPLATE);
        assert!(arg.no_color && arg.abort_errors);
        assert!(!arg.debug);
        assert_eq!(arg.command, None);
    }
}
