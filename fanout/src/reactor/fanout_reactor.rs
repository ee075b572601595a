// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR

use super::{PendingSignal, ReactorSetupError, SourceKindReady};
use crate::{FanoutState, LoopControl, Session, SessionId};
use mio::{Events, Interest, Poll, Token, Waker, event::Event};
use signal_hook::consts::{SIGINT, SIGTSTP, SIGWINCH};
use signal_hook_mio::v1_0::Signals;
use std::{collections::HashMap, io::ErrorKind, sync::Arc, time::Duration};

pub(super) const DEBUG_REACTOR: bool = false;

/// While shells are busy, the reactor keeps polling with this timeout until a pass
/// reads nothing.
pub const QUIET_POLL_TIMEOUT: Duration = Duration::from_millis(200);

const EVENTS_CAPACITY: usize = 64;

/// The single-threaded loop that drives every pty master, the signals and the input
/// bridge.
///
/// One iteration of [`run()`](Self::run):
/// 1. forward a pending `^C` / `^Z` to the enabled shells,
/// 2. poll with [`QUIET_POLL_TIMEOUT`] while shells are busy and still printing,
/// 3. print the lines the shells left unfinished,
/// 4. refresh the status line if the ready count changed,
/// 5. ask the input bridge for the next line,
/// 6. leave once every shell terminated and exited,
/// 7. otherwise block in one poll pass.
#[allow(missing_debug_implementations)]
pub struct Reactor {
    pub(super) poll: Poll,
    pub(super) events: Events,
    pub(super) signals: Signals,
    pub(super) waker: Arc<Waker>,
    /// What each session's pty master is currently registered for.
    pub(super) interests: HashMap<SessionId, Interest>,
    pub(super) pending_signal: Option<PendingSignal>,
    /// The partial line taken from the editor, given back with the next prompt.
    pub(super) initial_text: String,
}

/// What a poll pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PassOutcome {
    pub had_reads: bool,
    pub control: LoopControl,
}

/// Readiness of a pty master, copied out of a [`mio::event::Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

impl From<&Event> for Readiness {
    fn from(event: &Event) -> Self {
        Self {
            // A hangup or an error is found out by reading.
            readable: event.is_readable() || event.is_read_closed() || event.is_error(),
            writable: event.is_writable(),
        }
    }
}

impl Reactor {
    /// Creates the poll instance, the waker for the input bridge and the signal pipe.
    ///
    /// # Errors
    ///
    /// If any of them can't be created or registered.
    pub fn setup() -> Result<Self, ReactorSetupError> {
        let poll = Poll::new().map_err(ReactorSetupError::CreatePoll)?;
        let waker = Waker::new(poll.registry(), SourceKindReady::Waker.to_token())
            .map_err(ReactorSetupError::CreateWaker)?;
        let mut signals =
            Signals::new([SIGINT, SIGTSTP, SIGWINCH]).map_err(ReactorSetupError::CreateSignals)?;
        poll.registry()
            .register(
                &mut signals,
                SourceKindReady::Signals.to_token(),
                Interest::READABLE,
            )
            .map_err(ReactorSetupError::RegisterSignals)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            signals,
            waker: Arc::new(waker),
            interests: HashMap::new(),
            pending_signal: None,
            initial_text: String::new(),
        })
    }

    /// Hand this to the input bridge, every event it sends wakes the poll.
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> { self.waker.clone() }

    /// Runs until every shell terminated or something asked to exit. Returns the
    /// process exit code.
    pub fn run(&mut self, state: &mut FanoutState) -> i32 {
        let mut last_status = None;
        loop {
            if let LoopControl::Exit(code) = self.iterate(state, &mut last_status) {
                // Clears the prompt.
                state.output(b"");
                tracing::debug!(message = "reactor exits", code);
                return code;
            }
        }
    }

    fn iterate(
        &mut self,
        state: &mut FanoutState,
        last_status: &mut Option<(usize, usize)>,
    ) -> LoopControl {
        if let Some(signal) = self.pending_signal.take() {
            self.forward_signal(state, signal);
        }

        while state.registry.count_ready().0 > 0 {
            let outcome = self.poll_pass(state, Some(QUIET_POLL_TIMEOUT));
            if outcome.control.is_exit() {
                return outcome.control;
            }
            if !outcome.had_reads {
                break;
            }
        }

        let ids = state.registry.all_ids();
        state.for_each_session(&ids, |session, env| session.print_unfinished_line(env));

        let status = state.registry.count_ready();
        if *last_status != Some(status) {
            state.output(b"");
        }
        self.request_line(state);
        *last_status = Some(status);

        // A terminated shell is still exiting, its exit code arrives with the hang up.
        if state.registry.all_terminated() && state.registry.iter().all(Session::is_dead) {
            return LoopControl::Exit(state.options.exit_code);
        }
        if self.pending_signal.is_some() {
            return LoopControl::Continue;
        }
        self.poll_pass(state, None).control
    }

    /// Waits for events (at most `timeout`) and hands each one to its source.
    pub(super) fn poll_pass(
        &mut self,
        state: &mut FanoutState,
        timeout: Option<Duration>,
    ) -> PassOutcome {
        // Breaks the borrow of `self.events` so handlers can use `&mut self`.
        fn collect_ready(events: &Events) -> Vec<(Token, Readiness)> {
            events
                .iter()
                .map(|event| (event.token(), Readiness::from(event)))
                .collect()
        }

        let mut outcome = PassOutcome {
            had_reads: false,
            control: LoopControl::Continue,
        };

        self.sync_interests(state);
        if let Err(err) = self.poll.poll(&mut self.events, timeout) {
            // EINTR, a signal arrived. It is in the signal pipe.
            if err.kind() != ErrorKind::Interrupted {
                tracing::error!(message = "poll failed", ?err);
                state.output(format!("Polling failed: {err}\n").as_bytes());
                outcome.control = LoopControl::Exit(1);
            }
            return outcome;
        }

        for (token, readiness) in collect_ready(&self.events) {
            match SourceKindReady::from_token(token) {
                // Drained below, the bridge may also have events without a wake.
                SourceKindReady::Waker => {}
                SourceKindReady::Signals => self.consume_pending_signals(state),
                SourceKindReady::Session(id) => {
                    outcome.had_reads |= Self::handle_session_event(state, id, readiness);
                }
            }
            if let Some(code) = state.take_exit_request() {
                outcome.control = LoopControl::Exit(code);
                return outcome;
            }
        }

        outcome.control = self.consume_bridge_events(state);
        if let Some(code) = state.take_exit_request() {
            outcome.control = outcome.control.and_then(LoopControl::Exit(code));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Console, HostSpec, PtyShellSpawner, RuntimeOptions, SessionRegistry,
                SshCommandBuilder, TermSize, test_fixtures::CapturedOutput};
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    const LOCAL_SHELL: &str = "exec env FANOUT_HOST={host} bash --norc --noprofile";

    /// Runs `command` on each host without a prompt, like `fanout --command`.
    fn run_command(template: &str, hosts: &[&str], command: &str) -> (String, i32) {
        let captured = CapturedOutput::default();
        let spawner = PtyShellSpawner::new(SshCommandBuilder::new(template));
        let registry = SessionRegistry::new(Box::new(spawner), TermSize::new(80, 24));
        let console = Console::with_writer(Box::new(captured.clone()), false);
        let options = RuntimeOptions {
            command: Some(command.to_string()),
            ..Default::default()
        };
        let mut state = FanoutState::new(registry, console, options);
        let mut reactor = Reactor::setup().unwrap();

        let hosts: Vec<HostSpec> = hosts.iter().map(|host| HostSpec::parse(host)).collect();
        state
            .registry
            .create(&hosts, &mut state.console, &mut state.options);
        let code = reactor.run(&mut state);
        (captured.text(), code)
    }

    #[test]
    #[serial]
    fn test_failed_command_sets_the_exit_code() {
        let (output, code) = run_command(LOCAL_SHELL, &["h"], "echo before; false");
        assert!(output.contains("h : before\n"));
        assert_eq!(code, 1);
    }

    #[test]
    #[serial]
    fn test_exit_code_is_the_highest_of_all_shells() {
        let (_, code) = run_command(
            LOCAL_SHELL,
            &["a", "b"],
            "case $FANOUT_HOST in b) (exit 3);; esac",
        );
        assert_eq!(code, 3);
    }

    #[test]
    #[serial]
    fn test_shell_that_never_starts_counts() {
        let (_, code) = run_command("exec /bin/sh -c 'exit 4' {host}", &["h"], "true");
        assert_eq!(code, 4);
    }
}
