// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use rustix::{io, pipe::pipe, stdio::dup2_stdin};
use std::os::fd::{AsFd, OwnedFd};

/// The byte the line editor reads from the redirected stdin: `Ctrl-\`, which nobody
/// types by accident.
pub const INTERRUPT_CONTROL_BYTE: u8 = 0x1c;

/// Descriptor 0 temporarily replaced by the read end of a pipe that holds
/// [`INTERRUPT_CONTROL_BYTE`]. The real stdin comes back on [`restore()`] or drop.
///
/// [`restore()`]: Self::restore
#[derive(Debug)]
pub struct StdinRedirect {
    original_stdin: Option<OwnedFd>,
    _pipe_read: OwnedFd,
}

impl StdinRedirect {
    /// # Errors
    ///
    /// If stdin can't be duplicated or the pipe can't be set up. Stdin is untouched in
    /// that case.
    pub fn arm() -> io::Result<Self> {
        let original_stdin = io::dup(std::io::stdin().as_fd())?;
        let (pipe_read, pipe_write) = pipe()?;
        io::write(&pipe_write, &[INTERRUPT_CONTROL_BYTE])?;
        drop(pipe_write);
        dup2_stdin(&pipe_read)?;
        Ok(Self {
            original_stdin: Some(original_stdin),
            _pipe_read: pipe_read,
        })
    }

    /// # Errors
    ///
    /// If the original descriptor can't be put back.
    pub fn restore(mut self) -> io::Result<()> { self.restore_inner() }

    fn restore_inner(&mut self) -> io::Result<()> {
        match self.original_stdin.take() {
            Some(original) => dup2_stdin(&original),
            None => Ok(()),
        }
    }
}

impl Drop for StdinRedirect {
    fn drop(&mut self) {
        if let Err(err) = self.restore_inner() {
            tracing::error!(message = "failed to restore stdin", ?err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Read as _;

    #[test]
    #[serial]
    fn test_redirected_stdin_yields_the_control_byte_then_eof() {
        let redirect = StdinRedirect::arm().unwrap();

        let mut acc = Vec::new();
        let mut stdin_file = std::fs::File::from(io::dup(std::io::stdin().as_fd()).unwrap());
        stdin_file.read_to_end(&mut acc).unwrap();
        assert_eq!(acc, vec![INTERRUPT_CONTROL_BYTE]);

        redirect.restore().unwrap();
    }
}
