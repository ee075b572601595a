// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The reactor side of the input bridge handshake.

use super::{PendingSignal, Reactor};
use crate::{BridgeEvent, FanoutState, InputBridge, LoopControl, process_input};

/// `waiting (2/5)> ` while shells are busy, `ready (5)> ` otherwise.
#[must_use]
pub fn format_prompt(awaiting: usize, total: usize) -> String {
    if awaiting > 0 {
        format!("waiting ({awaiting}/{total})> ")
    } else {
        format!("ready ({total})> ")
    }
}

impl Reactor {
    /// Handles what the input bridge sent since the last pass. Lines are processed one
    /// at a time, the bridge waits for the next request before reading another one.
    pub(super) fn consume_bridge_events(&mut self, state: &mut FanoutState) -> LoopControl {
        while let Some(event) = state.console.input_bridge_mut().and_then(InputBridge::try_recv) {
            let control = match event {
                BridgeEvent::Line(line) => process_input(state, &format!("{line}\n")),
                // Sent as a line so a shell at its prompt exits.
                BridgeEvent::Eof => process_input(state, "\x04\n"),
                BridgeEvent::CtrlC => {
                    self.pending_signal = Some(PendingSignal::Interrupt);
                    LoopControl::Continue
                }
                BridgeEvent::CtrlZ => {
                    self.pending_signal = Some(PendingSignal::Suspend);
                    LoopControl::Continue
                }
                BridgeEvent::ControlByteConsumed { partial } => {
                    self.initial_text = partial;
                    LoopControl::Continue
                }
                BridgeEvent::Failed(reason) => {
                    tracing::error!(message = "input bridge failed", reason);
                    state.output(format!("Failed to read input: {reason}\n").as_bytes());
                    LoopControl::Exit(1)
                }
            };
            if control.is_exit() {
                return control;
            }
        }
        LoopControl::Continue
    }

    /// Asks the bridge for the next line, unless one is already asked for. Publishes the
    /// shell names for completion first.
    pub(super) fn request_line(&mut self, state: &mut FanoutState) {
        if !state.options.interactive {
            return;
        }
        let (awaiting, total) = state.registry.count_ready();
        let prompt = format_prompt(awaiting, total);
        let shells = state.registry.shell_entries();

        let Some(bridge) = state.console.input_bridge_mut() else {
            return;
        };
        if bridge.is_line_requested() {
            return;
        }
        bridge.completion().publish_shells(shells);
        let initial_text = std::mem::take(&mut self.initial_text);
        if !bridge.request_line(&prompt, &initial_text, state.mask_next_input) {
            tracing::warn!(message = "input bridge is gone");
            return;
        }
        state.mask_next_input = false;
        state.console.set_last_status_length(prompt.len());
    }
}
