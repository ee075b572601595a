// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{HostSpec, TermSize};
use std::{fmt::Debug,
          io::{self, Read, Write},
          os::fd::RawFd};

/// The local end of one remote shell: a non-blocking byte stream plus control over the
/// child process behind it.
///
/// [`crate::PtyShellTransport`] is the real thing (a pty master with `sh -c "exec ssh
/// ..."` on the other side). Tests use an in-memory shell that implements this trait
/// instead.
pub trait ShellTransport: Read + Write + Debug {
    /// Descriptor to register with [`mio`]. `None` for transports that are not backed
    /// by a descriptor, which the reactor then never polls.
    fn raw_fd(&self) -> Option<RawFd>;

    fn pid(&self) -> Option<u32>;

    /// Pushes a new window size to the remote side.
    ///
    /// # Errors
    ///
    /// If the size can't be applied to the pty.
    fn resize(&mut self, size: TermSize) -> io::Result<()>;

    /// Sends `SIGKILL` to the whole process group of the child. A child that is
    /// already gone is not an error.
    fn kill_process_group(&mut self);

    /// Waits for the child to exit and returns its exit code.
    fn reap(&mut self) -> i32;
}

/// Creates the transport for a new session.
pub trait ShellSpawner: Debug {
    /// # Errors
    ///
    /// If the pty can't be opened or the child can't be started.
    fn spawn(&mut self, host: &HostSpec, size: TermSize)
    -> miette::Result<Box<dyn ShellTransport>>;
}
