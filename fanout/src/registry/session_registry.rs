// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{DisplayNames, HostSpec, expand_host_syntax};
use crate::{Console, RuntimeOptions, Session, SessionEnv, SessionId, SessionState,
            SessionTrigger, ShellEntry, ShellSpawner, TermSize, TriggerRegistry,
            FiredTrigger, prefix_color_for};
use std::collections::{BTreeMap, HashSet};

const DEBUG_REGISTRY: bool = false;

/// Narrowest width pushed to a remote terminal, unless the local one is even smaller.
pub const MIN_REMOTE_WIDTH: u16 = 10;

/// Every session, plus the state they share: the trigger registry, the display name
/// allocator, and the local terminal size.
///
/// Session methods are always called through [`with_session()`], which lends the shared
/// state to the session and afterwards takes care of what a single session can't do on
/// its own: handing markers to the session that owns them, and resizing every remote
/// terminal when the longest name changed.
///
/// [`with_session()`]: Self::with_session
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
    next_id: usize,
    nr_colored: usize,
    triggers: TriggerRegistry<SessionTrigger>,
    names: DisplayNames,
    spawner: Box<dyn ShellSpawner>,
    terminal_size: TermSize,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(spawner: Box<dyn ShellSpawner>, terminal_size: TermSize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 0,
            nr_colored: 0,
            triggers: TriggerRegistry::new(),
            names: DisplayNames::new(),
            spawner,
            terminal_size,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.sessions.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.sessions.is_empty() }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> { self.sessions.get(&id) }

    /// Sessions in no particular order, for the reactor's bookkeeping.
    pub fn iter(&self) -> impl Iterator<Item = &Session> { self.sessions.values() }

    /// Sessions ordered by display name.
    #[must_use]
    pub fn all_sessions(&self) -> Vec<&Session> {
        let mut acc: Vec<&Session> = self.sessions.values().collect();
        acc.sort_by(|lhs, rhs| lhs.display_name().cmp(rhs.display_name()));
        acc
    }

    /// Ids ordered by display name.
    #[must_use]
    pub fn all_ids(&self) -> Vec<SessionId> {
        self.all_sessions().iter().map(|session| session.id()).collect()
    }

    #[must_use]
    pub fn max_display_name_length(&self) -> usize { self.names.max_display_name_length() }

    /// Starts one session per host. In interactive mode a progress line is shown and
    /// erased at the end.
    pub fn create(
        &mut self,
        hosts: &[HostSpec],
        console: &mut Console,
        options: &mut RuntimeOptions,
    ) -> Vec<SessionId> {
        let mut created = Vec::with_capacity(hosts.len());
        let mut last_progress_len = 0;
        for (index, host) in hosts.iter().enumerate() {
            if options.interactive {
                let progress = format!("Started {index}/{} remote processes\r", hosts.len());
                console.output_unlogged(progress.as_bytes());
                last_progress_len = progress.len();
            }
            if let Some(id) = self.add_session(host.clone(), console, options) {
                created.push(id);
            }
        }
        if last_progress_len > 0 {
            let mut clear = vec![b' '; last_progress_len];
            clear.push(b'\r');
            console.output_unlogged(&clear);
        }
        self.after_change();
        created
    }

    fn add_session(
        &mut self,
        host: HostSpec,
        console: &mut Console,
        options: &mut RuntimeOptions,
    ) -> Option<SessionId> {
        let display_name = match self.names.change(None, Some(&host.hostname)) {
            Ok(Some(name)) => name,
            Ok(None) => return None,
            Err(err) => {
                console.output(format!("{err}\n").as_bytes());
                return None;
            }
        };

        let transport = match self.spawner.spawn(&host, self.terminal_size) {
            Ok(transport) => transport,
            Err(report) => {
                tracing::error!(message = "failed to spawn session", %host, ?report);
                console.output(format!("{report}\n").as_bytes());
                self.names.set_enabled(&display_name, false);
                if let Err(err) = self.names.change(Some(&display_name), None) {
                    tracing::warn!(message = "add_session", %err);
                }
                return None;
            }
        };

        let id = SessionId(self.next_id);
        self.next_id += 1;
        let color_code = options.use_color.then(|| {
            let code = prefix_color_for(self.nr_colored);
            self.nr_colored += 1;
            code
        });

        let mut env = SessionEnv::new(console, options, &mut self.triggers, &mut self.names);
        let session = Session::new(id, host, display_name, transport, color_code, &mut env);
        DEBUG_REGISTRY.then(|| {
            tracing::debug!(message = "add_session", ?id, name = session.display_name(), pid = ?session.pid());
        });
        self.sessions.insert(id, session);
        Some(id)
    }

    /// Runs `f` on one session with the shared state lent through a [`SessionEnv`].
    /// Returns `None` if there is no such session.
    pub fn with_session<R>(
        &mut self,
        id: SessionId,
        console: &mut Console,
        options: &mut RuntimeOptions,
        f: impl FnOnce(&mut Session, &mut SessionEnv<'_>) -> R,
    ) -> Option<R> {
        let session = self.sessions.get_mut(&id)?;
        let mut env = SessionEnv::new(console, options, &mut self.triggers, &mut self.names);
        let result = f(session, &mut env);
        let foreign_triggers = std::mem::take(&mut env.foreign_triggers);

        for fired in foreign_triggers {
            self.deliver_trigger(fired, console, options);
        }
        self.after_change();
        Some(result)
    }

    /// Runs `f` on each of `ids`, in order.
    pub fn for_each_session(
        &mut self,
        ids: &[SessionId],
        console: &mut Console,
        options: &mut RuntimeOptions,
        mut f: impl FnMut(&mut Session, &mut SessionEnv<'_>),
    ) {
        for &id in ids {
            self.with_session(id, console, options, |session, env| f(session, env));
        }
    }

    /// A shell echoed a marker that belongs to another session (the user ran
    /// `/bin/echo` with it, or the shells share a terminal multiplexer).
    fn deliver_trigger(
        &mut self,
        fired: FiredTrigger<SessionTrigger>,
        console: &mut Console,
        options: &mut RuntimeOptions,
    ) {
        let Some(owner) = self.sessions.get_mut(&fired.callback.owner) else {
            return;
        };
        let mut env = SessionEnv::new(console, options, &mut self.triggers, &mut self.names);
        owner.apply_trigger(fired.callback.action, &fired.payload, &mut env);
    }

    fn after_change(&mut self) {
        if self.names.take_max_changed() {
            self.propagate_terminal_size();
        }
    }

    /// Kills and forgets a session. Its display name becomes available again and its
    /// triggers never fire.
    pub fn remove(
        &mut self,
        id: SessionId,
        console: &mut Console,
        options: &mut RuntimeOptions,
    ) -> Option<Session> {
        let mut session = self.sessions.remove(&id)?;
        let mut env = SessionEnv::new(console, options, &mut self.triggers, &mut self.names);
        session.close(&mut env);
        self.triggers.forget_where(|trigger| trigger.owner == id);
        self.after_change();
        Some(session)
    }

    /// Sends `SIGKILL` to every child, nothing is printed.
    pub fn kill_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.kill();
        }
    }

    /// Sessions whose display name matches one of the whitespace separated `patterns`
    /// (host syntax first, then glob), ordered by display name. Empty or `*` selects
    /// everything. A pattern that selects nothing is reported once.
    pub fn select(&self, patterns: &str, console: &mut Console) -> Vec<SessionId> {
        let all = self.all_sessions();
        let patterns = patterns.trim();
        if patterns.is_empty() || patterns == "*" {
            return all.iter().map(|session| session.id()).collect();
        }

        let mut seen = HashSet::new();
        let mut acc = Vec::new();
        for pattern in patterns.split_whitespace() {
            let mut found = false;
            for expanded in expand_host_syntax(pattern) {
                let matcher = glob::Pattern::new(&expanded);
                for session in &all {
                    let is_match = match &matcher {
                        Ok(matcher) => matcher.matches(session.display_name()),
                        Err(_) => session.display_name() == expanded,
                    };
                    if is_match {
                        found = true;
                        if seen.insert(session.id()) {
                            acc.push(session.id());
                        }
                    }
                }
            }
            if !found && !all.is_empty() {
                console.output(format!("{pattern} not found\n").as_bytes());
            }
        }
        acc
    }

    /// `(awaiting, total)` over enabled sessions. Awaiting means not at the prompt.
    #[must_use]
    pub fn count_ready(&self) -> (usize, usize) {
        self.sessions
            .values()
            .filter(|session| session.is_enabled())
            .fold((0, 0), |(awaiting, total), session| {
                let busy = usize::from(session.state() != SessionState::Idle);
                (awaiting + busy, total + 1)
            })
    }

    /// Every session is done, and there is at least one.
    #[must_use]
    pub fn all_terminated(&self) -> bool {
        !self.sessions.is_empty()
            && self.sessions.values().all(|session| {
                matches!(session.state(), SessionState::Terminated | SessionState::Dead)
            })
    }

    pub fn set_terminal_size(&mut self, size: TermSize) {
        self.terminal_size = size;
        self.propagate_terminal_size();
    }

    /// Remote terminals are narrower than the local one by the width of the name
    /// prefix, so their lines don't wrap once prefixed.
    pub fn propagate_terminal_size(&mut self) {
        let size = remote_terminal_size(self.terminal_size, self.names.max_display_name_length());
        for session in self.sessions.values_mut() {
            if session.is_enabled() {
                session.resize(size);
            }
        }
    }

    /// What the completer needs to know about each shell.
    #[must_use]
    pub fn shell_entries(&self) -> Vec<ShellEntry> {
        self.all_sessions()
            .iter()
            .map(|session| ShellEntry {
                name: session.display_name().to_string(),
                enabled: session.is_enabled(),
                dead: session.is_dead(),
                has_buffered_output: session.has_buffered_output(),
            })
            .collect()
    }
}

/// `max(cols - max_name_len - 2, min(cols, 10))` columns, same rows.
#[must_use]
pub fn remote_terminal_size(local: TermSize, max_name_len: usize) -> TermSize {
    let prefix_len = u16::try_from(max_name_len + 2).unwrap_or(u16::MAX);
    let cols = local
        .cols
        .saturating_sub(prefix_len)
        .max(local.cols.min(MIN_REMOTE_WIDTH));
    TermSize::new(cols, local.rows)
}

/// Lays out `:list` rows: every column but the last is padded to its widest cell.
#[must_use]
pub fn format_listing(rows: &[Vec<Vec<u8>>]) -> Vec<u8> {
    let nr_columns = rows.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..nr_columns)
        .map(|column| {
            rows.iter()
                .map(|row| row.get(column).map_or(0, Vec::len))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut acc = Vec::new();
    for row in rows {
        for (column, cell) in row.iter().enumerate() {
            if column > 0 {
                acc.push(b' ');
            }
            acc.extend_from_slice(cell);
            if column + 1 < nr_columns {
                let padding = widths[column].saturating_sub(cell.len());
                acc.resize(acc.len() + padding, b' ');
            }
        }
        acc.push(b'\n');
    }
    acc
}
