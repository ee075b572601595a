// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words ptys epoll kqueue rustyline

// Skip rustfmt for rest of file.
// https://stackoverflow.com/a/75910283/2085356
#![cfg_attr(rustfmt, rustfmt_skip)]

//! # fanout
//!
//! An interactive console that fans every command line out to many remote shells at
//! once, and merges what they print back into one terminal, one line at a time, each
//! line prefixed with the name of the shell that produced it.
//!
//! ```text
//! $ fanout web<1-3> db01
//! ready (4)> uptime
//! db01  :  10:21:07 up 41 days,  2:04,  0 users,  load average: 0.08, 0.05, 0.01
//! web1  :  10:21:07 up 12 days, 19:55,  0 users,  load average: 0.31, 0.22, 0.18
//! web2  :  10:21:07 up 12 days, 19:55,  0 users,  load average: 0.12, 0.11, 0.09
//! web3  :  10:21:07 up  3 days,  1:17,  0 users,  load average: 0.00, 0.01, 0.05
//! ready (4)> :disable web*
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ReadLine / Ack   ┌──────────────────────────────────────────────┐
//! │ input bridge │ ◄───────────────► │ reactor (mio::Poll, single thread)           │
//! │ (rustyline)  │  Line + Waker     │   signals ─► deferred ^C / ^Z, resize        │
//! └──────────────┘                   │   registry ─► session ─► ByteBufferChannel   │
//!                                    │                            │  ▲              │
//!                                    └────────────────────────────┼──┼──────────────┘
//!                                                                 ▼  │ pty master fds
//!                                                         sh -c "exec ssh host"  ...
//! ```
//!
//! - [`buffered_io`]: per-descriptor read/write byte buffers with a hard cap.
//! - [`triggers`]: two-part in-band markers used to detect prompts and renames.
//! - [`session`]: one remote shell, its pty, and its 5-state machine.
//! - [`registry`]: every live session, display names, selection by pattern.
//! - [`reactor`]: the poll loop that drives all I/O from one thread.
//! - [`input_bridge`]: the only other thread, which owns the line editor.
//!
//! Only the reactor thread touches session state. The input bridge hands completed lines
//! over through an acknowledged channel handoff and a [`mio::Waker`].

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod buffered_io;
pub mod config;
pub mod console;
pub mod control_commands;
pub mod core;
pub mod input_bridge;
pub mod reactor;
pub mod registry;
pub mod session;
pub mod triggers;

#[cfg(test)]
pub mod test_fixtures;

// Re-export stable public API using glob imports for a flat API surface.
#[allow(ambiguous_glob_reexports)]
pub use buffered_io::*;
#[allow(ambiguous_glob_reexports)]
pub use config::*;
#[allow(ambiguous_glob_reexports)]
pub use console::*;
#[allow(ambiguous_glob_reexports)]
pub use control_commands::*;
#[allow(ambiguous_glob_reexports)]
pub use core::*;
#[allow(ambiguous_glob_reexports)]
pub use input_bridge::*;
#[allow(ambiguous_glob_reexports)]
pub use reactor::*;
#[allow(ambiguous_glob_reexports)]
pub use registry::*;
#[allow(ambiguous_glob_reexports)]
pub use session::*;
#[allow(ambiguous_glob_reexports)]
pub use triggers::*;
