// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{collections::VecDeque,
          io::{self, ErrorKind, Read, Write}};

/// One step of a [`ScriptedIo`] read script.
#[derive(Debug)]
pub enum ScriptedRead {
    Data(Vec<u8>),
    Eof,
    Interrupted,
    OsError(i32),
}

impl ScriptedRead {
    pub fn data(bytes: &[u8]) -> Self { Self::Data(bytes.to_vec()) }

    pub fn os_error(raw: i32) -> Self { Self::OsError(raw) }
}

/// [`Read`] + [`Write`] that replays a script of reads and records every write.
///
/// Once the script is exhausted every read would block. A [`ScriptedRead::Data`] step
/// larger than the caller's buffer is consumed across several reads.
#[derive(Debug, Default)]
pub struct ScriptedIo {
    reads: VecDeque<ScriptedRead>,
    written: Vec<u8>,
    max_write: Option<usize>,
    write_would_block: bool,
}

impl ScriptedIo {
    pub fn new(reads: Vec<ScriptedRead>) -> Self {
        Self {
            reads: reads.into(),
            ..Default::default()
        }
    }

    /// Every `write()` accepts at most `max` bytes.
    pub fn set_max_write(&mut self, max: usize) { self.max_write = Some(max); }

    pub fn set_write_would_block(&mut self, would_block: bool) {
        self.write_would_block = would_block;
    }

    pub fn written(&self) -> &[u8] { &self.written }
}

impl Read for ScriptedIo {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            None => Err(ErrorKind::WouldBlock.into()),
            Some(ScriptedRead::Eof) => Ok(0),
            Some(ScriptedRead::Interrupted) => Err(ErrorKind::Interrupted.into()),
            Some(ScriptedRead::OsError(raw)) => Err(io::Error::from_raw_os_error(raw)),
            Some(ScriptedRead::Data(mut data)) => {
                let count = data.len().min(buf.len());
                buf[..count].copy_from_slice(&data[..count]);
                if count < data.len() {
                    let rest = data.split_off(count);
                    self.reads.push_front(ScriptedRead::Data(rest));
                }
                Ok(count)
            }
        }
    }
}

impl Write for ScriptedIo {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_would_block {
            return Err(ErrorKind::WouldBlock.into());
        }
        let count = self.max_write.map_or(buf.len(), |max| max.min(buf.len()));
        self.written.extend_from_slice(&buf[..count]);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
