// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The input bridge: the only thread besides the reactor. It owns the line editor and
//! hands every finished line to the reactor.
//!
//! ```text
//!  reactor                                   bridge thread
//!  ───────                                   ─────────────
//!  request_line("ready (3)> ", "") ───────►  editor.readline_with_initial()
//!                                            ... user types ...
//!  poll() wakes on Waker          ◄───────   BridgeEvent::Line("uptime")
//!  process the line
//!  request_line(..) (the acknowledgement) ─► next readline
//! ```
//!
//! The bridge never sends a second line-carrying event before the reactor asked for the
//! next line, so the two threads never work on a line at the same time.
//!
//! # Interrupting the editor
//!
//! Output from the shells must not be printed over the prompt the editor drew. Before
//! printing, the reactor takes the editor out of `readline()` (see
//! [`InputBridge::interrupt_readline()`]):
//!
//! 1. Put a pipe holding one `Ctrl-\` byte in place of stdin.
//! 2. Wake the editor through its external printer, so it polls stdin again.
//! 3. The editor reads the byte, the handler bound to it reports the partial line with
//!    [`BridgeEvent::ControlByteConsumed`] and waits.
//! 4. The reactor restores stdin and lets the handler return, which ends `readline()`
//!    with the terminal back in cooked mode.
//!
//! The partial line is given back as initial text by the next
//! [`InputBridge::request_line()`].

// Attach sources.
pub mod bridge_protocol;
pub mod bridge_thread;
pub mod completion;
pub mod input_bridge_handle;
pub mod line_helper;
pub mod stdin_redirect;

// Re-export.
pub use bridge_protocol::*;
pub use bridge_thread::*;
pub use completion::*;
pub use input_bridge_handle::*;
pub use line_helper::*;
pub use stdin_redirect::*;
