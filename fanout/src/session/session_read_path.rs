// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words keyscan

//! How a [`Session`] turns raw pty output into prefixed lines, state changes and
//! trigger actions.

use super::{Session, SessionEnv, SessionState};
use crate::{FiredTrigger, PeerStatus, ReadChunk, SessionTrigger,
            contains_subslice, contains_subslice_ignore_ascii_case};

const DEBUG_READ_PATH: bool = false;

const UNKNOWN_HOST_WARNING: &[u8] = b"The authenticity of host";
const UNKNOWN_HOST_ADVICE: &[u8] =
    b" Closing connection. Consider manually connecting or using ssh-keyscan.";
const CHANGED_HOST_WARNING: &[u8] = b"REMOTE HOST IDENTIFICATION HAS CHANGED";
const CHANGED_HOST_ADVICE: &[u8] =
    b"Remote host identification has changed. Consider manually connecting or using ssh-keyscan.";
const PASSWORD_PROMPT: &[u8] = b"password:";

impl Session {
    /// The pty master is readable (or hung up). Returns `false` if the session was
    /// already dead and nothing was done.
    pub fn handle_read(&mut self, env: &mut SessionEnv<'_>) -> bool {
        if self.is_dead() {
            return false;
        }

        let ReadChunk { new_data, peer } = self.channel.read_available();
        DEBUG_READ_PATH.then(|| {
            tracing::debug!(message = "handle_read", name = self.display_name, len = new_data.len(), ?peer);
        });
        if self.debug && !new_data.is_empty() {
            let msg = [b"==> ", &new_data[..]].concat();
            self.print_debug(&msg, env);
        }

        self.process_read_buffer(env);

        match peer {
            PeerStatus::Open => {
                if !self.is_dead() && !self.channel.is_read_ready() {
                    let msg = format!(
                        "{}: more than {} bytes without a newline, disconnecting\n",
                        self.display_name,
                        self.channel.max_size()
                    );
                    env.console.output(msg.as_bytes());
                    self.disconnect(env);
                }
            }
            PeerStatus::Closed => self.handle_close(env),
            PeerStatus::Failed(err) => self.handle_io_error(&err, env),
        }
        true
    }

    /// Called when no shell printed anything for a while: shows the partial line of a
    /// running command (a progress bar, a prompt for input).
    pub fn print_unfinished_line(&mut self, env: &mut SessionEnv<'_>) {
        if self.state != SessionState::Running {
            return;
        }
        let unfinished = self.channel.take_read_buffer();
        if unfinished.is_empty() {
            return;
        }
        match env.triggers.try_consume(&unfinished) {
            Some(fired) => self.route_trigger(fired, env),
            None => self.print_lines(&unfinished, env),
        }
    }

    fn process_read_buffer(&mut self, env: &mut SessionEnv<'_>) {
        if self.handle_read_fast_case(env) {
            return;
        }

        let has_complete_line = self.channel.read_buffer().contains(&b'\n');
        if !has_complete_line
            && self.state == SessionState::NotStarted
            && contains_subslice_ignore_ascii_case(self.channel.read_buffer(), PASSWORD_PROMPT)
            && let Some(password) = env.options.password.clone()
        {
            self.dispatch_write(format!("{password}\n").as_bytes(), env);
            self.channel.read_buffer_mut().clear();
            return;
        }

        while let Some(lf_pos) = self.channel.read_buffer().iter().position(|&byte| byte == b'\n')
        {
            let line: Vec<u8> = self.channel.read_buffer_mut().drain(..=lf_pos).collect();
            self.process_line(&line, env);
            if self.is_dead() {
                return;
            }
            if self.handle_read_fast_case(env) {
                return;
            }
        }

        if self.state == SessionState::NotStarted && !self.init_string_sent {
            let init_string = self.init_string.clone();
            self.dispatch_write(&init_string, env);
            self.init_string_sent = true;
        }
    }

    /// Running and no marker anywhere: print every complete line at once.
    fn handle_read_fast_case(&mut self, env: &mut SessionEnv<'_>) -> bool {
        if self.state != SessionState::Running
            || env.triggers.contains_marker(self.channel.read_buffer())
        {
            return false;
        }
        let Some(last_lf) = self.channel.read_buffer().iter().rposition(|&byte| byte == b'\n')
        else {
            return false;
        };
        let complete: Vec<u8> = self.channel.read_buffer_mut().drain(..=last_lf).collect();
        self.print_lines(&complete, env);
        true
    }

    fn process_line(&mut self, line: &[u8], env: &mut SessionEnv<'_>) {
        if let Some(fired) = env.triggers.try_consume(line) {
            self.route_trigger(fired, env);
            return;
        }
        match self.state {
            SessionState::Idle | SessionState::Running => self.print_lines(line, env),
            SessionState::NotStarted => {
                self.read_in_state_not_started.extend_from_slice(line);
                if contains_subslice(line, UNKNOWN_HOST_WARNING) {
                    self.disconnect(env);
                    let msg = [line.trim_ascii_end(), UNKNOWN_HOST_ADVICE].concat();
                    self.print_lines(&msg, env);
                } else if contains_subslice(line, CHANGED_HOST_WARNING) {
                    self.print_lines(CHANGED_HOST_ADVICE, env);
                }
            }
            SessionState::Terminated | SessionState::Dead => {}
        }
    }

    /// Markers of other sessions are queued on `env` for the registry.
    fn route_trigger(&mut self, fired: FiredTrigger<SessionTrigger>, env: &mut SessionEnv<'_>) {
        if fired.callback.owner == self.id {
            self.apply_trigger(fired.callback.action, &fired.payload, env);
        } else {
            env.foreign_triggers.push(fired);
        }
    }
}
