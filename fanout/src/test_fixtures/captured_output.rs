// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{cell::RefCell, io, rc::Rc};

/// A console writer whose output the test can read back.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Rc<RefCell<Vec<u8>>>);

impl CapturedOutput {
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> { self.0.borrow().clone() }

    #[must_use]
    pub fn text(&self) -> String { String::from_utf8_lossy(&self.0.borrow()).into_owned() }

    /// Returns what was captured so far and starts over.
    pub fn take_text(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
