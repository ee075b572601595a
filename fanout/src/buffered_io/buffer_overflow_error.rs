// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Appending to the write buffer would take it past its cap. The buffer is left as it
/// was before the append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("Buffer too big ({attempted_len}), the limit is {max_len} bytes")]
#[diagnostic(
    code(r3bl_fanout::buffered_io::buffer_overflow),
    help("The remote shell is not consuming its input. The session is disconnected.")
)]
pub struct BufferOverflowError {
    /// Length the buffer would have had after the append.
    pub attempted_len: usize,
    pub max_len: usize,
}
