// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{SessionEnv, SessionId, SessionState, SessionTrigger, ShellTransport,
            TriggerAction, build_init_string, marker_echo_command, prompt_assignment};
use crate::{BufferOverflowError, ByteBufferChannel, HostSpec, SUFFIX_SEPARATOR, TermSize,
            TriggerRepeat, colorize_prefix};
use std::{io, os::fd::RawFd};

const DEBUG_SESSION: bool = false;

/// Holds the status of a non-interactive command until the shell exits with it.
const EXIT_STATUS_VAR: &str = "FANOUT_RC";

/// One remote shell: its pty channel, its state machine, and how its output is shown.
///
/// Sessions are owned by the [`crate::SessionRegistry`]. Every method that can print,
/// change the display name, or register a trigger borrows the registry's shared state
/// through a [`SessionEnv`].
#[derive(Debug)]
pub struct Session {
    pub(super) id: SessionId,
    pub(super) host: HostSpec,
    pub(super) channel: ByteBufferChannel<Box<dyn ShellTransport>>,
    pub(super) state: SessionState,
    pub(super) enabled: bool,
    pub(super) debug: bool,
    pub(super) display_name: String,
    pub(super) color_code: Option<u8>,
    pub(super) term_size: Option<TermSize>,
    pub(super) init_string: Vec<u8>,
    pub(super) init_string_sent: bool,
    /// Output received before the first prompt, shown if the session dies before
    /// reaching it (ssh errors) or on `:show_read_buffer`.
    pub(super) read_in_state_not_started: Vec<u8>,
    /// Non-interactive mode: the command to run once the prompt shows up.
    pub(super) pending_command: Option<String>,
    pub(super) last_printed_line: Vec<u8>,
}

impl Session {
    /// `display_name` must already be acquired from the registry's
    /// [`crate::DisplayNames`].
    pub fn new(
        id: SessionId,
        host: HostSpec,
        display_name: String,
        transport: Box<dyn ShellTransport>,
        color_code: Option<u8>,
        env: &mut SessionEnv<'_>,
    ) -> Self {
        let prompt = env.triggers.register(
            "prompt",
            SessionTrigger {
                owner: id,
                action: TriggerAction::SeenPrompt,
            },
            TriggerRepeat::Always,
        );
        let pending_command = (!env.is_interactive())
            .then(|| env.options.command.clone().unwrap_or_default());

        Self {
            id,
            host,
            channel: ByteBufferChannel::new(transport),
            state: SessionState::NotStarted,
            enabled: true,
            debug: env.options.debug,
            display_name,
            color_code,
            term_size: None,
            init_string: build_init_string(&prompt),
            init_string_sent: false,
            read_in_state_not_started: Vec::new(),
            pending_command,
            last_printed_line: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId { self.id }

    #[must_use]
    pub fn host(&self) -> &HostSpec { &self.host }

    #[must_use]
    pub fn state(&self) -> SessionState { self.state }

    #[must_use]
    pub fn is_enabled(&self) -> bool { self.enabled }

    #[must_use]
    pub fn is_dead(&self) -> bool { self.state == SessionState::Dead }

    #[must_use]
    pub fn display_name(&self) -> &str { &self.display_name }

    #[must_use]
    pub fn debug(&self) -> bool { self.debug }

    pub fn set_debug(&mut self, debug: bool) { self.debug = debug; }

    #[must_use]
    pub fn term_size(&self) -> Option<TermSize> { self.term_size }

    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> { self.channel.io().raw_fd() }

    #[must_use]
    pub fn pid(&self) -> Option<u32> { self.channel.io().pid() }

    #[must_use]
    pub fn is_read_ready(&self) -> bool { !self.is_dead() && self.channel.is_read_ready() }

    #[must_use]
    pub fn is_write_ready(&self) -> bool { !self.is_dead() && self.channel.is_write_ready() }

    #[must_use]
    pub fn has_buffered_output(&self) -> bool { !self.read_in_state_not_started.is_empty() }

    #[must_use]
    pub fn channel(&self) -> &ByteBufferChannel<Box<dyn ShellTransport>> { &self.channel }

    /// Used by collaborators that need the descriptor for themselves for a while.
    pub fn pause_writes(&mut self) { self.channel.pause_writes(); }

    pub fn resume_writes(&mut self) { self.channel.resume_writes(); }

    pub fn change_state(&mut self, state: SessionState, env: &mut SessionEnv<'_>) {
        if state == self.state || self.is_dead() {
            return;
        }
        if self.debug {
            let state_name: &'static str = state.into();
            self.print_debug(format!("state => {state_name}").as_bytes(), env);
        }
        if self.state == SessionState::NotStarted {
            self.read_in_state_not_started.clear();
        }
        DEBUG_SESSION.then(|| {
            tracing::debug!(message = "change_state", name = self.display_name, from = %self.state, to = %state);
        });
        self.state = state;
    }

    /// The maximum name length only counts enabled shells in interactive mode. In
    /// non-interactive mode the indentation stays stable while shells exit.
    pub fn set_enabled(&mut self, enabled: bool, env: &mut SessionEnv<'_>) {
        if self.enabled != enabled && env.is_interactive() {
            env.names.set_enabled(&self.display_name, enabled);
        }
        self.enabled = enabled;
    }

    /// Queues `bytes` for the remote shell. Does nothing and returns `false` if the
    /// session is dead or disabled.
    pub fn dispatch_write(&mut self, bytes: &[u8], env: &mut SessionEnv<'_>) -> bool {
        if self.is_dead() || !self.enabled {
            return false;
        }
        match self.channel.enqueue_write(bytes) {
            Ok(()) => true,
            Err(err) => {
                self.handle_overflow(err, env);
                false
            }
        }
    }

    /// Sends a command line and marks the session as running it.
    pub fn dispatch_command(&mut self, bytes: &[u8], env: &mut SessionEnv<'_>) -> bool {
        let dispatched = self.dispatch_write(bytes, env);
        if dispatched {
            self.change_state(SessionState::Running, env);
        }
        dispatched
    }

    /// Kills the remote side and marks the session dead.
    pub fn disconnect(&mut self, env: &mut SessionEnv<'_>) {
        self.channel.io_mut().kill_process_group();
        self.channel.clear_buffers();
        self.set_enabled(false, env);

        if !self.read_in_state_not_started.is_empty() {
            let buffered = std::mem::take(&mut self.read_in_state_not_started);
            self.print_lines(&buffered, env);
        }
        if env.options.abort_errors && self.state == SessionState::NotStarted {
            env.options.request_exit(1);
        }
        self.change_state(SessionState::Dead, env);
    }

    /// The child closed the pty: collect its exit code, then disconnect.
    pub fn handle_close(&mut self, env: &mut SessionEnv<'_>) {
        if self.is_dead() {
            return;
        }
        let exit_code = self.channel.io_mut().reap();
        env.options.fold_exit_code(exit_code);
        if exit_code != 0 && env.is_interactive() {
            let msg = format!("Error talking to {}\n", self.display_name);
            env.console.output(msg.as_bytes());
        }
        self.disconnect(env);
    }

    /// Any I/O error other than "would block" or a hang up.
    pub fn handle_io_error(&mut self, err: &io::Error, env: &mut SessionEnv<'_>) {
        if self.is_dead() {
            return;
        }
        tracing::warn!(message = "session I/O error", name = self.display_name, ?err);
        let msg = format!("Error talking to {}: {err}\n", self.display_name);
        env.console.output(msg.as_bytes());
        self.disconnect(env);
    }

    fn handle_overflow(&mut self, err: BufferOverflowError, env: &mut SessionEnv<'_>) {
        tracing::warn!(message = "session buffer overflow", name = self.display_name, %err);
        let msg = format!("{}: {err}, disconnecting\n", self.display_name);
        env.console.output(msg.as_bytes());
        self.disconnect(env);
    }

    /// Flushes the write buffer as far as the pty accepts without blocking.
    pub fn handle_write(&mut self, env: &mut SessionEnv<'_>) {
        while !self.is_dead() && self.channel.is_write_ready() {
            let pending = if self.debug {
                self.channel.write_buffer().to_vec()
            } else {
                Vec::new()
            };
            match self.channel.flush_write() {
                Ok(0) => break,
                Ok(count) => {
                    let hide_password = self.state == SessionState::NotStarted
                        && env.options.password.is_some();
                    if self.debug && !hide_password {
                        let msg = [b"<== ", &pending[..count]].concat();
                        self.print_debug(&msg, env);
                    }
                }
                Err(err) => {
                    self.handle_io_error(&err, env);
                    break;
                }
            }
        }
    }

    /// `[dbg] <name>[<state>]: <msg>`.
    pub fn print_debug(&mut self, msg: &[u8], env: &mut SessionEnv<'_>) {
        let state_name: &'static str = self.state.into();
        let mut line = format!("[dbg] {}[{state_name}]: ", self.display_name).into_bytes();
        line.extend_from_slice(msg);
        line.push(b'\n');
        env.console.output(&line);
    }

    /// Prints shell output with the name prefix. Leading and trailing newlines are
    /// dropped and blank lines are collapsed.
    pub fn print_lines(&mut self, lines: &[u8], env: &mut SessionEnv<'_>) {
        let lines = trim_newlines(lines);
        if lines.is_empty() {
            return;
        }
        let lines = collapse_blank_lines(lines);

        let indent = env
            .names
            .max_display_name_length()
            .saturating_sub(self.display_name.chars().count());
        let prefix = format!("{}{} : ", self.display_name, " ".repeat(indent)).into_bytes();
        let shown_prefix = match self.color_code {
            Some(code) => colorize_prefix(&prefix, code),
            None => prefix.clone(),
        };

        let mut shown = Vec::with_capacity(lines.len() * 2);
        let mut logged = Vec::with_capacity(lines.len() * 2);
        for line in lines.split(|&byte| byte == b'\n') {
            shown.extend_from_slice(&shown_prefix);
            shown.extend_from_slice(line);
            shown.push(b'\n');
            logged.extend_from_slice(&prefix);
            logged.extend_from_slice(line);
            logged.push(b'\n');
        }
        env.console.output_logged(&shown, &logged);

        let last_start = lines
            .iter()
            .rposition(|&byte| byte == b'\n')
            .map_or(0, |index| index + 1);
        self.last_printed_line = lines[last_start..].to_vec();
    }

    /// Prints and clears what was received before the first prompt.
    pub fn show_read_buffer(&mut self, env: &mut SessionEnv<'_>) {
        let buffered = std::mem::take(&mut self.read_in_state_not_started);
        self.print_lines(&buffered, env);
    }

    /// Sets the display name to the shell-expanded `new_name`, or back to the hostname
    /// when it is empty.
    pub fn change_name(&mut self, new_name: &[u8], env: &mut SessionEnv<'_>) {
        let base = if new_name.is_empty() {
            self.host.hostname.clone()
        } else {
            String::from_utf8_lossy(new_name).into_owned()
        };
        // The allocator counts the new name as enabled.
        let uncounted = !self.enabled && env.is_interactive();
        if uncounted {
            env.names.set_enabled(&self.display_name, true);
        }
        match env.names.change(Some(&self.display_name), Some(&base)) {
            Ok(Some(name)) => self.display_name = name,
            Ok(None) => {}
            Err(err) => env.console.output(format!("{err}\n").as_bytes()),
        }
        if uncounted {
            env.names.set_enabled(&self.display_name, false);
        }
    }

    /// Asks the remote shell to expand `name` and echo it back behind a one-shot
    /// marker. The echo is what actually renames the session.
    pub fn rename(&mut self, name: &str, env: &mut SessionEnv<'_>) {
        if name.is_empty() {
            self.change_name(b"", env);
            return;
        }
        if name.contains(SUFFIX_SEPARATOR) {
            let msg = format!("Names cannot contain {SUFFIX_SEPARATOR}: {name}\n");
            env.console.output(msg.as_bytes());
            return;
        }
        let marker = env.triggers.register(
            "rename",
            SessionTrigger {
                owner: self.id,
                action: TriggerAction::Rename,
            },
            TriggerRepeat::Once,
        );
        self.dispatch_command(&marker_echo_command(&marker, name.as_bytes()), env);
    }

    /// Sends the init string again, for a shell whose prompt was changed by the user.
    pub fn reset_prompt(&mut self, env: &mut SessionEnv<'_>) {
        let init_string = self.init_string.clone();
        self.dispatch_command(&init_string, env);
    }

    /// Disconnects if needed, reaps the child and gives the display name back.
    pub fn close(&mut self, env: &mut SessionEnv<'_>) {
        if !self.is_dead() {
            self.disconnect(env);
        }
        self.channel.io_mut().reap();
        self.release_name(env);
    }

    /// `SIGKILL` to the remote side, without any bookkeeping. Used on shutdown.
    pub fn kill(&mut self) { self.channel.io_mut().kill_process_group(); }

    /// Gives the display name back so another session may use it.
    pub fn release_name(&mut self, env: &mut SessionEnv<'_>) {
        if let Err(err) = env.names.change(Some(&self.display_name), None) {
            tracing::warn!(message = "release_name", %err);
        }
    }

    /// Pushes a new window size unless the remote side already has it.
    pub fn resize(&mut self, size: TermSize) {
        if self.term_size == Some(size) {
            return;
        }
        self.term_size = Some(size);
        if let Err(err) = self.channel.io_mut().resize(size) {
            tracing::warn!(message = "failed to resize pty", name = self.display_name, ?err);
        }
    }

    /// Row of the `:list` table.
    #[must_use]
    pub fn get_info(&self) -> Vec<Vec<u8>> {
        let state_name: &'static str = self.state.into();
        vec![
            self.display_name.as_bytes().to_vec(),
            if self.enabled { b"enabled".to_vec() } else { b"disabled".to_vec() },
            format!("{state_name}:").into_bytes(),
            self.last_printed_line.trim_ascii().to_vec(),
        ]
    }

    /// Runs the action of a trigger owned by this session.
    pub fn apply_trigger(
        &mut self,
        action: TriggerAction,
        payload: &[u8],
        env: &mut SessionEnv<'_>,
    ) {
        match action {
            TriggerAction::SeenPrompt => self.seen_prompt(env),
            TriggerAction::RealPromptEnds => {}
            TriggerAction::Rename => self.change_name(payload, env),
            TriggerAction::Terminated => self.change_state(SessionState::Terminated, env),
        }
    }

    fn seen_prompt(&mut self, env: &mut SessionEnv<'_>) {
        if env.is_interactive() {
            self.change_state(SessionState::Idle, env);
            return;
        }
        let Some(command) = self.pending_command.take() else {
            return;
        };

        let real_prompt = env.triggers.register(
            "real prompt ends",
            SessionTrigger {
                owner: self.id,
                action: TriggerAction::RealPromptEnds,
            },
            TriggerRepeat::Always,
        );
        self.dispatch_command(&prompt_assignment(&real_prompt), env);
        if !command.is_empty() {
            self.dispatch_command(format!("{command}\n").as_bytes(), env);
        }
        let terminated = env.triggers.register(
            "terminated",
            SessionTrigger {
                owner: self.id,
                action: TriggerAction::Terminated,
            },
            TriggerRepeat::Once,
        );
        // The marker echo must not replace the status of the command.
        let mut epilogue = format!("{EXIT_STATUS_VAR}=$?; ").into_bytes();
        epilogue.extend_from_slice(&marker_echo_command(&terminated, b""));
        self.dispatch_command(&epilogue, env);
        self.dispatch_command(format!("exit ${EXIT_STATUS_VAR} 2>/dev/null\n").as_bytes(), env);
    }
}

fn trim_newlines(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&byte| byte != b'\n').unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&byte| byte != b'\n')
        .map_or(start, |index| index + 1);
    &bytes[start..end]
}

fn collapse_blank_lines(bytes: &[u8]) -> Vec<u8> {
    let mut acc = Vec::with_capacity(bytes.len());
    for &byte in bytes {
        if byte == b'\n' && acc.last() == Some(&b'\n') {
            continue;
        }
        acc.push(byte);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"\n\nabc\n", b"abc" ; "both ends")]
    #[test_case(b"abc", b"abc" ; "nothing to trim")]
    #[test_case(b"\n\n", b"" ; "only newlines")]
    #[test_case(b"a\n\nb", b"a\n\nb" ; "inner newlines kept")]
    fn test_trim_newlines(input: &[u8], expected: &[u8]) {
        assert_eq!(trim_newlines(input), expected);
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines(b"a\n\n\nb\nc\n\nd"), b"a\nb\nc\nd".to_vec());
    }
}
