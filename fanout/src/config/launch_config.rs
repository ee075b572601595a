// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words getpass

use super::{CLIArg, ConfigError};
use crate::{HostSpec, SshCommandBuilder, expand_host_args, is_stdin_tty, is_stdout_tty};
use rustix::termios::{self, LocalModes, OptionalActions};
use std::{fs::{self, OpenOptions},
          io::{self, BufRead, BufReader, Read, Write},
          path::{Path, PathBuf}};

/// Everything the command line resolves to, before any shell is started.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub hosts: Vec<HostSpec>,
    /// Set in non-interactive mode: from `--command`, or what was piped into stdin.
    pub command: Option<String>,
    pub ssh_builder: SshCommandBuilder,
    pub interactive: bool,
    pub use_color: bool,
    pub password: Option<String>,
    pub log_file: Option<PathBuf>,
    pub abort_errors: bool,
    pub debug: bool,
    pub trace_log: Option<PathBuf>,
}

/// The parts of the process environment that decide how arguments are resolved.
#[derive(Debug, Clone, Default)]
pub struct LaunchEnv {
    /// Contents of stdin when it is not a terminal.
    pub piped_stdin: Option<String>,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
}

impl LaunchEnv {
    /// Reads all of stdin if it is not a terminal.
    ///
    /// # Errors
    ///
    /// If stdin can't be read.
    pub fn detect() -> Result<Self, ConfigError> {
        let stdin_is_tty = is_stdin_tty();
        let piped_stdin = if stdin_is_tty {
            None
        } else {
            let mut acc = String::new();
            io::stdin()
                .read_to_string(&mut acc)
                .map_err(ConfigError::ReadStdin)?;
            Some(acc)
        };
        Ok(Self {
            piped_stdin,
            stdin_is_tty,
            stdout_is_tty: is_stdout_tty(),
        })
    }
}

impl LaunchConfig {
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn try_from_cli(arg: CLIArg) -> Result<Self, ConfigError> {
        Self::resolve(arg, LaunchEnv::detect()?)
    }

    /// Resolves `arg` against `env`. Reads the hosts and password files.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn resolve(arg: CLIArg, env: LaunchEnv) -> Result<Self, ConfigError> {
        let mut host_args = arg.host_names;
        for path in &arg.hosts_file {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::HostsFile {
                path: path.clone(),
                source,
            })?;
            host_args.extend(parse_hosts_file(&content));
        }
        if host_args.is_empty() {
            return Err(ConfigError::NoHosts);
        }

        let command = resolve_command(arg.command, env.piped_stdin)?;
        let interactive = command.is_none() && env.stdin_is_tty && env.stdout_is_tty;

        let password = match &arg.password_file {
            Some(path) => Some(read_password(path)?),
            None => None,
        };

        let mut ssh_builder = SshCommandBuilder::new(arg.ssh);
        if let Some(user) = arg.user {
            ssh_builder = ssh_builder.user(user);
        }

        Ok(Self {
            hosts: expand_host_args(&host_args),
            command,
            ssh_builder,
            interactive,
            use_color: env.stdout_is_tty && !arg.no_color,
            password,
            log_file: arg.log_file,
            abort_errors: arg.abort_errors,
            debug: arg.debug,
            trace_log: arg.trace_log,
        })
    }
}

/// One host per line, `#` starts a comment, blank lines are skipped.
#[must_use]
pub fn parse_hosts_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Piped stdin becomes the command, with a trailing newline. Empty stdin counts as no
/// command.
fn resolve_command(
    command: Option<String>,
    piped_stdin: Option<String>,
) -> Result<Option<String>, ConfigError> {
    let piped = piped_stdin.filter(|text| !text.is_empty());
    match (command, piped) {
        (Some(_), Some(_)) => Err(ConfigError::CommandAndStdin),
        (Some(command), None) => Ok(Some(command)),
        (None, Some(mut piped)) => {
            if !piped.ends_with('\n') {
                piped.push('\n');
            }
            Ok(Some(piped))
        }
        // Piped but empty stdin is non-interactive too, with nothing to run.
        (None, None) => Ok(None),
    }
}

/// First line of the file, or typed on the controlling terminal for `-`.
fn read_password(path: &Path) -> Result<String, ConfigError> {
    let to_error = |source| ConfigError::Password {
        path: path.to_path_buf(),
        source,
    };

    if path == Path::new("-") {
        return prompt_password_on_tty().map_err(to_error);
    }

    let file = fs::File::open(path).map_err(to_error)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).map_err(to_error)?;
    Ok(line.trim_end_matches('\n').to_string())
}

/// Like `getpass`: prompt on `/dev/tty` with echo turned off.
fn prompt_password_on_tty() -> io::Result<String> {
    let mut tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
    let original = termios::tcgetattr(&tty)?;
    let mut no_echo = original.clone();
    no_echo.local_modes.remove(LocalModes::ECHO);
    termios::tcsetattr(&tty, OptionalActions::Flush, &no_echo)?;

    tty.write_all(b"Password: ")?;
    tty.flush()?;
    let mut line = String::new();
    let read_result = BufReader::new(&tty).read_line(&mut line);

    termios::tcsetattr(&tty, OptionalActions::Flush, &original)?;
    tty.write_all(b"\n")?;
    read_result?;
    Ok(line.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> CLIArg {
        CLIArg::try_parse_from(std::iter::once("fanout").chain(args.iter().copied())).unwrap()
    }

    fn tty_env() -> LaunchEnv {
        LaunchEnv {
            piped_stdin: None,
            stdin_is_tty: true,
            stdout_is_tty: true,
        }
    }

    #[test]
    fn test_parse_hosts_file() {
        let content = "web1\n  web2:2200  # staging\n\n# all comment\ndb<1-2>\n";
        assert_eq!(parse_hosts_file(content), vec!["web1", "web2:2200", "db<1-2>"]);
    }

    #[test]
    fn test_interactive_on_a_terminal() {
        let config = LaunchConfig::resolve(cli(&["h<1-2>"]), tty_env()).unwrap();
        assert!(config.interactive);
        assert!(config.use_color);
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.command, None);
    }

    #[test]
    fn test_command_makes_it_non_interactive() {
        let config =
            LaunchConfig::resolve(cli(&["--command", "uptime", "--no-color", "h"]), tty_env())
                .unwrap();
        assert!(!config.interactive);
        assert!(!config.use_color);
        assert_eq!(config.command.as_deref(), Some("uptime"));
    }

    #[test]
    fn test_piped_stdin_becomes_the_command() {
        let env = LaunchEnv {
            piped_stdin: Some("hostname".into()),
            stdin_is_tty: false,
            stdout_is_tty: true,
        };
        let config = LaunchConfig::resolve(cli(&["h"]), env).unwrap();
        assert!(!config.interactive);
        assert_eq!(config.command.as_deref(), Some("hostname\n"));
    }

    #[test]
    fn test_command_and_piped_stdin_conflict() {
        let env = LaunchEnv {
            piped_stdin: Some("hostname\n".into()),
            stdin_is_tty: false,
            stdout_is_tty: false,
        };
        let result = LaunchConfig::resolve(cli(&["--command", "id", "h"]), env);
        assert!(matches!(result, Err(ConfigError::CommandAndStdin)));
    }

    #[test]
    fn test_no_hosts() {
        let result = LaunchConfig::resolve(cli(&[]), tty_env());
        assert!(matches!(result, Err(ConfigError::NoHosts)));
    }

    #[test]
    fn test_password_file_first_line() {
        let path = std::env::temp_dir().join(format!("fanout-pw-{}", std::process::id()));
        fs::write(&path, "s3cret\nignored\n").unwrap();
        let config = LaunchConfig::resolve(
            cli(&["--password-file", path.to_str().unwrap(), "h"]),
            tty_env(),
        )
        .unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.password.as_deref(), Some("s3cret"));
    }
}
