// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words alnum

use crate::find_subslice;
use rand::{Rng as _, distr::Alphanumeric};
use smallvec::SmallVec;
use std::collections::HashMap;

/// A marker fits on the stack unless the trigger name is unusually long.
pub type MarkerBytes = SmallVec<[u8; 64]>;

/// Every marker starts with this, followed by a random part chosen once per registry.
pub const MARKER_TAG: &str = "fanout-";

/// Length of every random part of a marker.
pub const RANDOM_PART_LEN: usize = 5;

/// Whether a trigger survives its first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRepeat {
    Once,
    Always,
}

/// The two halves of a marker, in the order they must be sent. Sending them as two
/// adjacent quoted shell words (`"first""second"`) means the command line itself never
/// contains the whole marker, only the shell's output does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerParts {
    pub first: MarkerBytes,
    pub second: MarkerBytes,
}

impl MarkerParts {
    /// `"first""second"` for embedding in a shell command.
    #[must_use]
    pub fn to_quoted_words(&self) -> Vec<u8> {
        let mut acc = Vec::with_capacity(self.first.len() + self.second.len() + 4);
        acc.push(b'"');
        acc.extend_from_slice(&self.first);
        acc.extend_from_slice(b"\"\"");
        acc.extend_from_slice(&self.second);
        acc.push(b'"');
        acc
    }

    #[must_use]
    pub fn joined(&self) -> Vec<u8> { [&self.first[..], &self.second[..]].concat() }
}

/// A trigger that matched a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger<C> {
    pub callback: C,
    /// What followed the marker on the line, with ASCII whitespace trimmed.
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct TriggerEntry<C> {
    callback: C,
    repeat: TriggerRepeat,
}

/// Maps in-band markers echoed by remote shells to callbacks.
///
/// A marker looks like this:
///
/// ```text
/// fanout-Xy3kQ:prompt:a8Zt0:17/
/// ╰─ common prefix ─╯╰name╯╰rand╯╰nr╯
/// ```
///
/// The common prefix is generated once per registry, so [`contains_marker()`] is a
/// single substring probe. The rest makes the marker unique: markers of one-shot
/// triggers that were already consumed, or that belong to a session that is gone, never
/// match anything again.
///
/// The callback type `C` is chosen by the user of the registry: the session state
/// machine uses plain data ([`crate::SessionTrigger`]) rather than closures, so the
/// registry does not borrow anything.
///
/// [`contains_marker()`]: Self::contains_marker
#[derive(Debug)]
pub struct TriggerRegistry<C> {
    common_prefix: MarkerBytes,
    nr_generated: usize,
    entries: HashMap<MarkerBytes, TriggerEntry<C>>,
}

impl<C: Clone> Default for TriggerRegistry<C> {
    fn default() -> Self { Self::new() }
}

impl<C: Clone> TriggerRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        let mut common_prefix = MarkerBytes::new();
        common_prefix.extend_from_slice(MARKER_TAG.as_bytes());
        common_prefix.extend_from_slice(random_alnum().as_bytes());
        common_prefix.push(b':');
        Self {
            common_prefix,
            nr_generated: 0,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn common_prefix(&self) -> &[u8] { &self.common_prefix }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Registers a new trigger and returns its marker split in two.
    pub fn register(&mut self, name: &str, callback: C, repeat: TriggerRepeat) -> MarkerParts {
        let nr = self.nr_generated;
        self.nr_generated += 1;

        let mut marker = self.common_prefix.clone();
        marker.extend(name.bytes().map(|byte| if byte == b'/' { b'_' } else { byte }));
        marker.push(b':');
        marker.extend_from_slice(random_alnum().as_bytes());
        marker.push(b':');
        marker.extend_from_slice(nr.to_string().as_bytes());
        marker.push(b'/');

        let split_at = self.common_prefix.len() / 2;
        let parts = MarkerParts {
            first: MarkerBytes::from_slice(&marker[..split_at]),
            second: MarkerBytes::from_slice(&marker[split_at..]),
        };

        self.entries.insert(marker, TriggerEntry { callback, repeat });
        parts
    }

    /// Cheap check used to skip line by line processing of shell output.
    #[must_use]
    pub fn contains_marker(&self, data: &[u8]) -> bool {
        find_subslice(data, &self.common_prefix).is_some()
    }

    /// Looks for a registered marker in `line`. One-shot triggers are removed when they
    /// fire. Lines with an unknown marker do not fire anything.
    pub fn try_consume(&mut self, line: &[u8]) -> Option<FiredTrigger<C>> {
        let start = find_subslice(line, &self.common_prefix)?;
        let end = start + line[start..].iter().position(|&byte| byte == b'/')? + 1;
        let marker = &line[start..end];

        let callback = match self.entries.get(marker)?.repeat {
            TriggerRepeat::Always => self.entries.get(marker)?.callback.clone(),
            TriggerRepeat::Once => self.entries.remove(marker)?.callback,
        };

        Some(FiredTrigger {
            callback,
            payload: line[end..].trim_ascii().to_vec(),
        })
    }

    /// Drops every trigger whose callback matches `predicate`, e.g. all the triggers of
    /// a session that is being destroyed.
    pub fn forget_where(&mut self, mut predicate: impl FnMut(&C) -> bool) {
        self.entries.retain(|_, entry| !predicate(&entry.callback));
    }
}

fn random_alnum() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PART_LEN)
        .map(char::from)
        .collect()
}
