// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EAGAIN EINTR

use super::BufferOverflowError;
use std::io::{self, ErrorKind, Read, Write};

/// Cap for both the read and the write buffer of one channel: 1 MiB.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Size of a single `read()` call. [`ByteBufferChannel::read_available`] loops until
/// the descriptor would block, so this only bounds the stack buffer.
pub const READ_CHUNK_SIZE: usize = 4096;

const DEBUG_BUFFERED_IO: bool = false;

/// What the other side of the descriptor looks like after a call to
/// [`ByteBufferChannel::read_available`].
#[derive(Debug)]
pub enum PeerStatus {
    /// Nothing more to read right now (`EAGAIN`), or the read buffer is full.
    Open,
    /// End of file, or `EIO` from a pty master whose child is gone.
    Closed,
    /// Any other OS error.
    Failed(io::Error),
}

/// Result of [`ByteBufferChannel::read_available`].
///
/// `new_data` may be non-empty even when `peer` is [`PeerStatus::Closed`]: the last
/// bytes a child wrote before exiting (usually an error message) are kept.
#[derive(Debug)]
pub struct ReadChunk {
    pub new_data: Vec<u8>,
    pub peer: PeerStatus,
}

/// A non-blocking descriptor with a read buffer (for line oriented processing) and a
/// write buffer (for writers that must never block).
///
/// ```text
///              read_available()                   enqueue_write()
///   io ──────────────► read_buffer      caller ──────────────► write_buffer
///        (\r becomes \n, stops at cap)              flush_write() ──────► io
/// ```
///
/// The channel never blocks: `read()` is called until it would block, and
/// [`flush_write()`] performs a single `write()`. Readiness is reported through
/// [`is_read_ready()`] and [`is_write_ready()`] so the reactor can register the matching
/// [`mio::Interest`].
///
/// [`flush_write()`]: Self::flush_write
/// [`is_read_ready()`]: Self::is_read_ready
/// [`is_write_ready()`]: Self::is_write_ready
#[derive(Debug)]
pub struct ByteBufferChannel<T> {
    io: T,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    max_size: usize,
    writes_paused: bool,
}

impl<T: Read + Write> ByteBufferChannel<T> {
    pub fn new(io: T) -> Self { Self::with_max_size(io, MAX_BUFFER_SIZE) }

    pub fn with_max_size(io: T, max_size: usize) -> Self {
        Self {
            io,
            read_buffer: Vec::new(),
            write_buffer: Vec::new(),
            max_size,
            writes_paused: false,
        }
    }

    /// Reads everything available without blocking, up to the room left in the read
    /// buffer. Every `\r` is turned into `\n`. The new bytes are appended to the read
    /// buffer and also returned.
    pub fn read_available(&mut self) -> ReadChunk {
        let mut new_data = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK_SIZE];

        let peer = loop {
            let room = self
                .max_size
                .saturating_sub(self.read_buffer.len() + new_data.len());
            if room == 0 {
                break PeerStatus::Open;
            }

            let want = room.min(READ_CHUNK_SIZE);
            match self.io.read(&mut chunk[..want]) {
                Ok(0) => break PeerStatus::Closed,
                Ok(count) => new_data.extend_from_slice(&chunk[..count]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break PeerStatus::Open,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if is_pty_hangup(&err) => break PeerStatus::Closed,
                Err(err) => break PeerStatus::Failed(err),
            }
        };

        for byte in &mut new_data {
            if *byte == b'\r' {
                *byte = b'\n';
            }
        }
        self.read_buffer.extend_from_slice(&new_data);

        DEBUG_BUFFERED_IO.then(|| {
            tracing::debug!(
                message = "read_available",
                new_len = new_data.len(),
                buffered_len = self.read_buffer.len(),
                ?peer
            );
        });

        ReadChunk { new_data, peer }
    }

    /// `false` once the read buffer reached its cap.
    #[must_use]
    pub fn is_read_ready(&self) -> bool { self.read_buffer.len() < self.max_size }

    /// `true` while there is something to write and writes are not paused.
    #[must_use]
    pub fn is_write_ready(&self) -> bool {
        !self.writes_paused && !self.write_buffer.is_empty()
    }

    /// Performs one non-blocking write of the write buffer and drops the bytes that were
    /// sent. Returns how many bytes were sent, `0` when the descriptor would block or
    /// writes are paused.
    ///
    /// # Errors
    ///
    /// Any OS error other than "would block".
    pub fn flush_write(&mut self) -> io::Result<usize> {
        if self.writes_paused || self.write_buffer.is_empty() {
            return Ok(0);
        }

        loop {
            match self.io.write(&self.write_buffer) {
                Ok(count) => {
                    self.write_buffer.drain(..count);
                    return Ok(count);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Appends `bytes` to the write buffer.
    ///
    /// # Errors
    ///
    /// [`BufferOverflowError`] if the buffer would grow past its cap. Nothing is
    /// appended in that case.
    pub fn enqueue_write(&mut self, bytes: &[u8]) -> Result<(), BufferOverflowError> {
        let attempted_len = self.write_buffer.len() + bytes.len();
        if attempted_len > self.max_size {
            return Err(BufferOverflowError {
                attempted_len,
                max_len: self.max_size,
            });
        }
        self.write_buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Hook for a collaborator that needs exclusive, blocking use of the descriptor
    /// (e.g. a file transfer). Queued bytes stay queued until [`resume_writes()`].
    ///
    /// [`resume_writes()`]: Self::resume_writes
    pub fn pause_writes(&mut self) { self.writes_paused = true; }

    pub fn resume_writes(&mut self) { self.writes_paused = false; }

    #[must_use]
    pub fn writes_paused(&self) -> bool { self.writes_paused }
}

impl<T> ByteBufferChannel<T> {
    #[must_use]
    pub fn read_buffer(&self) -> &[u8] { &self.read_buffer }

    /// Line framing consumes the read buffer from the front.
    pub fn read_buffer_mut(&mut self) -> &mut Vec<u8> { &mut self.read_buffer }

    pub fn take_read_buffer(&mut self) -> Vec<u8> { std::mem::take(&mut self.read_buffer) }

    #[must_use]
    pub fn write_buffer(&self) -> &[u8] { &self.write_buffer }

    pub fn clear_buffers(&mut self) {
        self.read_buffer.clear();
        self.write_buffer.clear();
    }

    #[must_use]
    pub fn max_size(&self) -> usize { self.max_size }

    #[must_use]
    pub fn io(&self) -> &T { &self.io }

    pub fn io_mut(&mut self) -> &mut T { &mut self.io }
}

/// Reading a pty master after the last slave descriptor was closed fails with `EIO` on
/// Linux instead of returning end of file.
fn is_pty_hangup(err: &io::Error) -> bool {
    err.raw_os_error() == Some(rustix::io::Errno::IO.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ScriptedIo, ScriptedRead};
    use pretty_assertions::assert_eq;

    fn channel(reads: Vec<ScriptedRead>) -> ByteBufferChannel<ScriptedIo> {
        ByteBufferChannel::new(ScriptedIo::new(reads))
    }

    #[test]
    fn test_read_until_would_block_and_normalize_carriage_returns() {
        let mut channel = channel(vec![
            ScriptedRead::data(b"hello\r\n"),
            ScriptedRead::data(b"wor"),
            ScriptedRead::data(b"ld\r"),
        ]);

        let chunk = channel.read_available();

        assert_eq!(chunk.new_data, b"hello\n\nworld\n".to_vec());
        assert!(matches!(chunk.peer, PeerStatus::Open));
        assert_eq!(channel.read_buffer(), b"hello\n\nworld\n");

        // Nothing left: would block, nothing new.
        let chunk = channel.read_available();
        assert!(chunk.new_data.is_empty());
        assert!(matches!(chunk.peer, PeerStatus::Open));
    }

    #[test]
    fn test_data_before_eof_is_returned_with_the_close() {
        let mut channel = channel(vec![
            ScriptedRead::data(b"Connection refused\n"),
            ScriptedRead::Eof,
        ]);

        let chunk = channel.read_available();

        assert_eq!(chunk.new_data, b"Connection refused\n".to_vec());
        assert!(matches!(chunk.peer, PeerStatus::Closed));
    }

    #[test]
    fn test_eio_is_a_close_not_a_failure() {
        let mut channel = channel(vec![
            ScriptedRead::data(b"bye\n"),
            ScriptedRead::os_error(rustix::io::Errno::IO.raw_os_error()),
        ]);

        let chunk = channel.read_available();

        assert_eq!(chunk.new_data, b"bye\n".to_vec());
        assert!(matches!(chunk.peer, PeerStatus::Closed));
    }

    #[test]
    fn test_other_errors_are_failures() {
        let mut channel = channel(vec![ScriptedRead::os_error(
            rustix::io::Errno::BADF.raw_os_error(),
        )]);

        let chunk = channel.read_available();

        assert!(chunk.new_data.is_empty());
        assert!(matches!(chunk.peer, PeerStatus::Failed(_)));
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let mut channel = channel(vec![
            ScriptedRead::Interrupted,
            ScriptedRead::data(b"after signal"),
        ]);

        let chunk = channel.read_available();

        assert_eq!(chunk.new_data, b"after signal".to_vec());
    }

    #[test]
    fn test_read_stops_at_the_cap() {
        let mut channel = ByteBufferChannel::with_max_size(
            ScriptedIo::new(vec![
                ScriptedRead::data(b"0123456789"),
                ScriptedRead::data(b"abcdef"),
            ]),
            8,
        );

        let chunk = channel.read_available();

        assert_eq!(chunk.new_data, b"01234567".to_vec());
        assert_eq!(channel.read_buffer().len(), 8);
        assert!(!channel.is_read_ready());

        // Full: no read happens at all.
        let chunk = channel.read_available();
        assert!(chunk.new_data.is_empty());
        assert!(matches!(chunk.peer, PeerStatus::Open));

        // Consuming from the front makes room again.
        channel.read_buffer_mut().drain(..4);
        assert!(channel.is_read_ready());
        let chunk = channel.read_available();
        assert_eq!(chunk.new_data, b"89ab".to_vec());
        assert_eq!(channel.read_buffer(), b"456789ab");
    }

    #[test]
    fn test_enqueue_write_overflow_leaves_buffer_untouched() {
        let mut channel = ByteBufferChannel::with_max_size(ScriptedIo::new(vec![]), 10);

        channel.enqueue_write(b"echo hi\n").unwrap();
        let err = channel.enqueue_write(b"abc").unwrap_err();

        assert_eq!(
            err,
            BufferOverflowError {
                attempted_len: 11,
                max_len: 10
            }
        );
        assert_eq!(channel.write_buffer(), b"echo hi\n");

        // Exactly at the cap is fine.
        channel.enqueue_write(b"ab").unwrap();
        assert_eq!(channel.write_buffer().len(), 10);
    }

    #[test]
    fn test_flush_write_is_one_partial_write() {
        let mut io = ScriptedIo::new(vec![]);
        io.set_max_write(4);
        let mut channel = ByteBufferChannel::new(io);
        channel.enqueue_write(b"echo hi\n").unwrap();
        assert!(channel.is_write_ready());

        assert_eq!(channel.flush_write().unwrap(), 4);
        assert_eq!(channel.write_buffer(), b" hi\n");
        assert_eq!(channel.flush_write().unwrap(), 4);
        assert!(!channel.is_write_ready());
        assert_eq!(channel.io().written(), b"echo hi\n");
    }

    #[test]
    fn test_flush_write_would_block_counts_as_zero() {
        let mut io = ScriptedIo::new(vec![]);
        io.set_write_would_block(true);
        let mut channel = ByteBufferChannel::new(io);
        channel.enqueue_write(b"ls\n").unwrap();

        assert_eq!(channel.flush_write().unwrap(), 0);
        assert_eq!(channel.write_buffer(), b"ls\n");
    }

    #[test]
    fn test_paused_writes_are_not_ready_and_not_flushed() {
        let mut channel = ByteBufferChannel::new(ScriptedIo::new(vec![]));
        channel.enqueue_write(b"data").unwrap();

        channel.pause_writes();
        assert!(!channel.is_write_ready());
        assert_eq!(channel.flush_write().unwrap(), 0);
        assert!(channel.io().written().is_empty());

        channel.resume_writes();
        assert!(channel.is_write_ready());
        assert_eq!(channel.flush_write().unwrap(), 4);
    }
}
