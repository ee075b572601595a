// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::complete_control_command;
use std::{collections::BTreeSet,
          sync::{Arc, Mutex, MutexGuard, PoisonError}};

/// Stop remembering words for completion after this many.
pub const MAX_HISTORY_WORDS: usize = 10_000;

/// What the completer may know about one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellEntry {
    pub name: String,
    pub enabled: bool,
    pub dead: bool,
    pub has_buffered_output: bool,
}

#[derive(Debug, Default, Clone)]
pub struct CompletionData {
    pub shells: Vec<ShellEntry>,
    pub history_words: BTreeSet<String>,
    pub path_commands: BTreeSet<String>,
}

impl CompletionData {
    /// Also lists the commands found in `$PATH`, once.
    #[must_use]
    pub fn with_path_commands() -> Self {
        let mut acc = Self {
            path_commands: read_commands_in_path(),
            ..Self::default()
        };
        acc.add_history_words("$FANOUT_RANK $FANOUT_NAME $FANOUT_DISPLAY_NAME");
        acc.add_history_words("$FANOUT_NR_SHELLS");
        acc
    }

    /// Words longer than one character typed in a line.
    pub fn add_history_words(&mut self, line: &str) {
        if self.history_words.len() < MAX_HISTORY_WORDS {
            self.history_words.extend(
                line.split_whitespace()
                    .filter(|word| word.chars().count() > 1)
                    .map(str::to_string),
            );
        }
    }
}

/// Completion data the reactor publishes before each read request. The editor thread
/// only ever sees this copy, never the live sessions.
#[derive(Debug, Clone, Default)]
pub struct CompletionSnapshot(Arc<Mutex<CompletionData>>);

impl CompletionSnapshot {
    #[must_use]
    pub fn new(data: CompletionData) -> Self { Self(Arc::new(Mutex::new(data))) }

    pub fn lock(&self) -> MutexGuard<'_, CompletionData> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish_shells(&self, shells: Vec<ShellEntry>) { self.lock().shells = shells; }
}

/// Completes the word under the cursor. Returns where the replaced word starts and the
/// candidates.
#[must_use]
pub fn complete_line(line: &str, pos: usize, data: &CompletionData) -> (usize, Vec<String>) {
    let before_cursor = &line[..pos];
    let start = before_cursor
        .rfind([' ', '\t', '\n'])
        .map_or(0, |index| index + 1);
    let text = &before_cursor[start..];

    if line.starts_with(':') {
        return (start, complete_control_command(before_cursor, text, start, data));
    }

    let (text, dropped_bang) = match text.strip_prefix('!') {
        Some(rest) if start == 0 => (rest, true),
        _ => (text, false),
    };

    let mut acc = complete_local_path(text);
    let longer_with_prefix =
        |word: &&String| word.len() > text.len() && word.starts_with(text);
    acc.extend(
        data.history_words
            .iter()
            .filter(longer_with_prefix)
            .map(|word| format!("{word} ")),
    );
    if start == 0 {
        acc.extend(
            data.path_commands
                .iter()
                .filter(longer_with_prefix)
                .map(|word| format!("{word} ")),
        );
    }

    let mut acc = remove_dupes(acc);
    if dropped_bang {
        for candidate in &mut acc {
            candidate.insert(0, '!');
        }
    }
    (start, acc)
}

/// Shell names starting with `text` that match `predicate` and are not already on the
/// line, each followed by a space.
#[must_use]
pub fn complete_shells(
    data: &CompletionData,
    line: &str,
    text: &str,
    predicate: impl Fn(&ShellEntry) -> bool,
) -> Vec<String> {
    data.shells
        .iter()
        .filter(|shell| shell.name.starts_with(text) && predicate(shell))
        .filter(|shell| !line.contains(&format!(" {} ", shell.name)))
        .map(|shell| format!("{} ", shell.name))
        .collect()
}

/// Paths starting with `text` after expansion, directories get a trailing `/`.
#[must_use]
pub fn complete_local_path(text: &str) -> Vec<String> {
    let pattern = format!("{}*", glob::Pattern::escape(&expand_local_path(text)));
    let Ok(paths) = glob::glob(&pattern) else {
        return Vec::new();
    };
    paths
        .flatten()
        .map(|path| {
            let suffix = if path.is_dir() { "/" } else { "" };
            format!("{}{suffix}", path.display())
        })
        .collect()
}

/// Expands `$VAR`, `${VAR}` and a leading `~`. An empty path means the home directory.
#[must_use]
pub fn expand_local_path(path: &str) -> String {
    let expanded = expand_vars(path);
    let expanded = if expanded.is_empty() { "~".to_string() } else { expanded };
    expand_user(&expanded)
}

fn expand_user(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => path.to_string(),
    }
}

/// Unknown variables are left as they are.
fn expand_vars(input: &str) -> String {
    let is_name_char = |ch: char| ch.is_ascii_alphanumeric() || ch == '_';
    let mut acc = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(dollar) = rest.find('$') {
        acc.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(close) => (&braced[..close], close + 2),
                None => ("", 0),
            }
        } else {
            let len = after.find(|ch| !is_name_char(ch)).unwrap_or(after.len());
            (&after[..len], len)
        };

        match std::env::var(name).ok().filter(|_| !name.is_empty()) {
            Some(value) => acc.push_str(&value),
            None => acc.push_str(&rest[dollar..=dollar + consumed]),
        }
        rest = &rest[dollar + 1 + consumed..];
    }
    acc.push_str(rest);
    acc
}

/// Keeps the first of the candidates that only differ by a trailing `/` or space.
fn remove_dupes(words: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    words
        .into_iter()
        .filter(|word| seen.insert(word.trim_end_matches(['/', ' ']).to_string()))
        .collect()
}

fn read_commands_in_path() -> BTreeSet<String> {
    let Some(path_var) = std::env::var_os("PATH") else {
        return BTreeSet::new();
    };
    std::env::split_paths(&path_var)
        .filter_map(|dir| std::fs::read_dir(dir).ok())
        .flat_map(|entries| entries.flatten())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}
