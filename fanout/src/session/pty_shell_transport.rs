// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words ONLCR openpty setsid

//! Real session transport: one pty pair per remote shell, the master stays here, the
//! slave becomes the controlling terminal of `/bin/sh -c "<ssh template>"`.

use super::{ShellSpawner, ShellTransport, SpawnError};
use crate::{HostSpec, TermSize};
use portable_pty::{CommandBuilder, MasterPty, PtySize, native_pty_system};
use rustix::{fs::{OFlags, fcntl_getfl, fcntl_setfl},
             process::{Pid, Signal, kill_process_group},
             termios::{self, LocalModes, OptionalActions, OutputModes}};
use std::{fmt,
          io::{self, Read, Write},
          os::fd::{BorrowedFd, RawFd},
          path::PathBuf};

/// Default `--ssh` template. `{host}` becomes `[user@]hostname`, `{port}` becomes
/// `-p <port>` (or nothing for port 22).
pub const DEFAULT_SSH_TEMPLATE: &str = "exec ssh -oLogLevel=Quiet -t {host} {port}";

const SHELL: &str = "/bin/sh";

/// Type alias for the controller half of the PTY (master).
pub type Controller = Box<dyn MasterPty + Send>;

/// Type alias for the child process spawned in the PTY.
pub type ControlledChild = Box<dyn portable_pty::Child + Send + Sync>;

/// Type alias for a validated PTY command ready for execution.
pub type PtyCommand = CommandBuilder;

/// Builds the `/bin/sh -c "<evaluated template>"` command for one host.
///
/// ```
/// # use r3bl_fanout::{HostSpec, SshCommandBuilder};
/// let builder = SshCommandBuilder::new("exec ssh -t {host} {port}").user("deploy");
/// let host = HostSpec::parse("web1:2222");
/// assert_eq!(builder.evaluate(&host), "exec ssh -t deploy@web1 -p 2222");
/// ```
#[derive(Debug, Clone)]
pub struct SshCommandBuilder {
    template: String,
    user: Option<String>,
    cwd: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
}

impl Default for SshCommandBuilder {
    fn default() -> Self { Self::new(DEFAULT_SSH_TEMPLATE) }
}

impl SshCommandBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            user: None,
            cwd: None,
            env_vars: Vec::new(),
        }
    }

    /// Remote user, the host becomes `user@host`.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the working directory of the local `sh`.
    ///
    /// If not called, defaults to the current directory when [`build()`](Self::build) is
    /// invoked.
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Substitutes `{host}` and `{port}` in the template. A template without `{host}`
    /// gets the host appended.
    #[must_use]
    pub fn evaluate(&self, host: &HostSpec) -> String {
        let name = match &self.user {
            Some(user) => format!("{user}@{}", host.hostname),
            None => host.hostname.clone(),
        };
        let evaluated = self
            .template
            .replace("{host}", &name)
            .replace("{port}", &host.port_argument());
        if self.template.contains("{host}") {
            evaluated
        } else {
            format!("{evaluated} {name}")
        }
    }

    /// Builds the final [`PtyCommand`].
    ///
    /// # Errors
    ///
    /// If no working directory was given and the current one can't be determined.
    pub fn build(&self, host: &HostSpec) -> Result<PtyCommand, SpawnError> {
        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().map_err(SpawnError::CurrentDir)?,
        };

        let mut command = PtyCommand::new(SHELL);
        command.arg("-c");
        command.arg(self.evaluate(host));
        command.cwd(cwd);
        for (key, value) in &self.env_vars {
            command.env(key, value);
        }
        Ok(command)
    }
}

/// A pty master, non-blocking, with the child process on the other side.
pub struct PtyShellTransport {
    controller: Controller,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    child: ControlledChild,
    raw_fd: RawFd,
}

impl fmt::Debug for PtyShellTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtyShellTransport")
            .field("raw_fd", &self.raw_fd)
            .field("pid", &self.child.process_id())
            .finish_non_exhaustive()
    }
}

impl PtyShellTransport {
    /// Opens a pty pair of `size`, starts `command` on the slave side, then closes the
    /// slave here so that end of file is seen when the child exits. The master gets
    /// `ONLCR` and `ECHO` cleared and is switched to non-blocking.
    ///
    /// # Errors
    ///
    /// See [`SpawnError`].
    pub fn spawn(host: &str, command: PtyCommand, size: TermSize) -> Result<Self, SpawnError> {
        let open_pty_err = |message: String| SpawnError::OpenPty {
            host: host.to_string(),
            message,
        };
        let configure_err = |source: io::Error| SpawnError::ConfigurePty {
            host: host.to_string(),
            source,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| open_pty_err(e.to_string()))?;

        let command_label = format!("{:?}", command.get_argv());
        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|e| SpawnError::SpawnCommand {
                host: host.to_string(),
                command: command_label,
                message: e.to_string(),
            })?;
        drop(pair.slave);

        let controller = pair.master;
        let raw_fd = controller
            .as_raw_fd()
            .ok_or_else(|| open_pty_err("the pty master has no descriptor".into()))?;

        // SAFETY: `raw_fd` is owned by `controller`, which outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(raw_fd) };
        configure_tty(fd).map_err(configure_err)?;
        set_non_blocking(fd).map_err(configure_err)?;

        let reader = controller
            .try_clone_reader()
            .map_err(|e| open_pty_err(e.to_string()))?;
        let writer = controller
            .take_writer()
            .map_err(|e| open_pty_err(e.to_string()))?;

        tracing::debug!(message = "spawned shell", host, pid = ?child.process_id(), raw_fd);

        Ok(Self {
            controller,
            reader,
            writer,
            child,
            raw_fd,
        })
    }
}

/// No `\n` to `\r\n` translation and no echo of what is sent.
fn configure_tty(fd: BorrowedFd<'_>) -> io::Result<()> {
    let mut attrs = termios::tcgetattr(fd)?;
    attrs.output_modes.remove(OutputModes::ONLCR);
    attrs.local_modes.remove(LocalModes::ECHO);
    termios::tcsetattr(fd, OptionalActions::Now, &attrs)?;
    Ok(())
}

/// The flag lives on the open file description, so the reader and writer clones of the
/// master become non-blocking too.
fn set_non_blocking(fd: BorrowedFd<'_>) -> io::Result<()> {
    let flags = fcntl_getfl(fd)?;
    fcntl_setfl(fd, flags | OFlags::NONBLOCK)?;
    Ok(())
}

impl Read for PtyShellTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { self.reader.read(buf) }
}

impl Write for PtyShellTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.writer.write(buf) }

    fn flush(&mut self) -> io::Result<()> { self.writer.flush() }
}

impl ShellTransport for PtyShellTransport {
    fn raw_fd(&self) -> Option<RawFd> { Some(self.raw_fd) }

    fn pid(&self) -> Option<u32> { self.child.process_id() }

    fn resize(&mut self, size: TermSize) -> io::Result<()> {
        self.controller
            .resize(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn kill_process_group(&mut self) {
        // The child is a session leader (setsid), its pid is its process group id.
        let group = self
            .child
            .process_id()
            .and_then(|pid| i32::try_from(pid).ok())
            .and_then(Pid::from_raw);
        let result = match group {
            Some(group) => kill_process_group(group, Signal::KILL).map_err(io::Error::from),
            None => self.child.kill(),
        };
        if let Err(err) = result {
            // Already gone.
            tracing::debug!(message = "kill_process_group", ?err);
        }
    }

    fn reap(&mut self) -> i32 {
        match self.child.wait() {
            Ok(status) => i32::try_from(status.exit_code()).unwrap_or(i32::MAX),
            Err(err) => {
                tracing::warn!(message = "failed to reap child", ?err);
                1
            }
        }
    }
}

/// Spawns a [`PtyShellTransport`] per host using an [`SshCommandBuilder`].
#[derive(Debug, Clone, Default)]
pub struct PtyShellSpawner {
    pub builder: SshCommandBuilder,
}

impl PtyShellSpawner {
    #[must_use]
    pub fn new(builder: SshCommandBuilder) -> Self { Self { builder } }
}

impl ShellSpawner for PtyShellSpawner {
    fn spawn(
        &mut self,
        host: &HostSpec,
        size: TermSize,
    ) -> miette::Result<Box<dyn ShellTransport>> {
        let command = self.builder.build(host)?;
        let transport = PtyShellTransport::spawn(&host.hostname, command, size)?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteBufferChannel, PeerStatus};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};
    use test_case::test_case;

    #[test_case(DEFAULT_SSH_TEMPLATE, None, "web1", "exec ssh -oLogLevel=Quiet -t web1 " ; "default port is empty")]
    #[test_case(DEFAULT_SSH_TEMPLATE, None, "web1:2222", "exec ssh -oLogLevel=Quiet -t web1 -p 2222" ; "non default port")]
    #[test_case(DEFAULT_SSH_TEMPLATE, Some("root"), "db", "exec ssh -oLogLevel=Quiet -t root@db " ; "user")]
    #[test_case("exec mosh", None, "db", "exec mosh db" ; "host appended")]
    #[test_case("exec mosh {port}", Some("u"), "db:22", "exec mosh  u@db" ; "port only template gets host appended")]
    fn test_evaluate_template(template: &str, user: Option<&str>, host: &str, expected: &str) {
        let mut builder = SshCommandBuilder::new(template);
        if let Some(user) = user {
            builder = builder.user(user);
        }
        assert_eq!(builder.evaluate(&HostSpec::parse(host)), expected);
    }

    #[test]
    fn test_build_uses_sh_dash_c() {
        let command = SshCommandBuilder::new("exec true")
            .cwd(std::env::temp_dir())
            .env("FANOUT_TEST", "1")
            .build(&HostSpec::parse("h"))
            .unwrap();
        let argv: Vec<String> = command
            .get_argv()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(argv, vec!["/bin/sh", "-c", "exec true h"]);
    }

    #[test]
    fn test_spawn_reads_output_until_close() {
        let mut spawner = PtyShellSpawner::new(SshCommandBuilder::new("exec /bin/echo {host}"));
        let transport = spawner
            .spawn(&HostSpec::parse("hello"), TermSize::new(80, 24))
            .unwrap();
        assert!(transport.raw_fd().is_some());

        let mut channel = ByteBufferChannel::new(transport);
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let chunk = channel.read_available();
            if !matches!(chunk.peer, PeerStatus::Open) || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        // ONLCR is cleared, so there is no `\r` to normalize.
        assert_eq!(channel.read_buffer(), b"hello\n");
        assert_eq!(channel.io_mut().reap(), 0);
    }
}
