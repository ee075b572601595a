// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Signals and the control characters they turn into.

use super::{Reactor, fanout_reactor::DEBUG_REACTOR};
use crate::{FanoutState, get_terminal_size, run_control_command};
use signal_hook::consts::{SIGINT, SIGTSTP, SIGWINCH};

/// A `^C` or `^Z` waiting to be forwarded to the shells at the top of the next
/// iteration, never from inside a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSignal {
    Interrupt,
    Suspend,
}

impl PendingSignal {
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            PendingSignal::Interrupt => 'C',
            PendingSignal::Suspend => 'Z',
        }
    }
}

impl Reactor {
    pub(super) fn consume_pending_signals(&mut self, state: &mut FanoutState) {
        let arrived: Vec<i32> = self.signals.pending().collect();
        for signal in arrived {
            DEBUG_REACTOR.then(|| tracing::debug!(message = "signal", signal));
            match signal {
                SIGINT => self.pending_signal = Some(PendingSignal::Interrupt),
                SIGTSTP => self.pending_signal = Some(PendingSignal::Suspend),
                SIGWINCH => state.registry.set_terminal_size(get_terminal_size()),
                _ => {}
            }
        }
    }

    /// Sends the control character to the enabled shells and drops the partial line.
    pub(super) fn forward_signal(&mut self, state: &mut FanoutState, signal: PendingSignal) {
        let letter = signal.letter();
        state.console.log(format!("> ^{letter}\n").as_bytes());
        run_control_command(state, &format!("send_ctrl {}", letter.to_ascii_lowercase()));
        state.output(b"");
        self.initial_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Console, HostSpec, RuntimeOptions, SessionRegistry, TermSize,
                test_fixtures::{CapturedOutput, StubShellSpawner, pump_registry}};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_forwarded_signal_reaches_enabled_shells() {
        let spawner = StubShellSpawner::new();
        let registry = SessionRegistry::new(Box::new(spawner.clone()), TermSize::new(80, 24));
        let console = Console::with_writer(Box::new(CapturedOutput::default()), false);
        let options = RuntimeOptions {
            interactive: true,
            ..Default::default()
        };
        let mut state = FanoutState::new(registry, console, options);
        let hosts = [HostSpec::parse("a"), HostSpec::parse("b")];
        state
            .registry
            .create(&hosts, &mut state.console, &mut state.options);
        pump_registry(&mut state.registry, &mut state.console, &mut state.options);
        crate::toggle_shells(&mut state, "b", false);

        let mut reactor = Reactor::setup().unwrap();
        reactor.initial_text = "half typ".to_string();
        reactor.forward_signal(&mut state, PendingSignal::Interrupt);
        pump_registry(&mut state.registry, &mut state.console, &mut state.options);

        assert!(reactor.initial_text.is_empty());
        assert!(spawner.shell("a").unwrap().received().contains(&0x03));
        assert!(!spawner.shell("b").unwrap().received().contains(&0x03));
    }
}
