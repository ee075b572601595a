// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use mio::Waker;
use std::sync::{Arc, Mutex,
                atomic::{AtomicBool, Ordering},
                mpsc::{Receiver, Sender}};

/// Reactor to bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    /// Read one line. Also acknowledges the previous event.
    ReadLine {
        prompt: String,
        initial_text: String,
        /// Echo `*` instead of the typed characters, and keep the line out of history.
        masked: bool,
    },
    Shutdown,
}

/// Bridge to reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Line(String),
    /// `Ctrl-D` on an empty line.
    Eof,
    CtrlC,
    CtrlZ,
    /// The editor left `readline()` because the reactor asked for it.
    ControlByteConsumed { partial: String },
    /// The editor failed, no more lines will come.
    Failed(String),
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum InputBridgeError {
    #[error("Failed to set up the line editor: {0}")]
    #[diagnostic(code(r3bl_fanout::input_bridge::editor))]
    Editor(String),

    #[error("Failed to start the input bridge thread")]
    #[diagnostic(code(r3bl_fanout::input_bridge::thread))]
    ThreadSpawn(#[source] std::io::Error),

    #[error("The input bridge thread exited during setup")]
    #[diagnostic(code(r3bl_fanout::input_bridge::setup))]
    SetupDisconnected,
}

/// Sends events to the reactor and wakes its [`mio::Poll`].
#[derive(Debug, Clone)]
pub struct EventSink {
    pub tx: Sender<BridgeEvent>,
    pub waker: Arc<Waker>,
}

impl EventSink {
    /// Returns `false` once the reactor is gone.
    pub fn send(&self, event: BridgeEvent) -> bool {
        if self.tx.send(event).is_err() {
            return false;
        }
        // A failed wake means the poll is gone too.
        self.waker.wake().is_ok()
    }
}

/// Flags shared by the handle (reactor side) and the bridge thread.
#[derive(Debug)]
pub struct BridgeShared {
    pub in_readline: AtomicBool,
    pub interrupt_requested: AtomicBool,
    pub control_byte_consumed: AtomicBool,
    pub ctrl_z_pressed: AtomicBool,
    pub masked: AtomicBool,
    resume_rx: Mutex<Receiver<()>>,
}

impl BridgeShared {
    #[must_use]
    pub fn new(resume_rx: Receiver<()>) -> Self {
        Self {
            in_readline: AtomicBool::new(false),
            interrupt_requested: AtomicBool::new(false),
            control_byte_consumed: AtomicBool::new(false),
            ctrl_z_pressed: AtomicBool::new(false),
            masked: AtomicBool::new(false),
            resume_rx: Mutex::new(resume_rx),
        }
    }

    /// Blocks the bridge thread until the reactor restored stdin.
    pub fn wait_for_resume(&self) {
        if let Ok(resume_rx) = self.resume_rx.lock() {
            // Disconnected means the reactor is gone, nothing to wait for.
            resume_rx.recv().ok();
        }
    }

    pub fn flag(flag: &AtomicBool) -> bool { flag.load(Ordering::SeqCst) }

    pub fn set(flag: &AtomicBool, value: bool) { flag.store(value, Ordering::SeqCst); }

    pub fn take(flag: &AtomicBool) -> bool { flag.swap(false, Ordering::SeqCst) }
}
