// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::collections::{BTreeMap, HashMap};

/// Separates a display name from its collision suffix, as in `web1#2`.
pub const SUFFIX_SEPARATOR: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum DisplayNameError {
    #[error("Names cannot contain {SUFFIX_SEPARATOR}: {0}")]
    #[diagnostic(
        code(r3bl_fanout::registry::display_name),
        help("`#` is reserved for the suffix that tells apart shells with the same name")
    )]
    ContainsSeparator(String),
}

/// Hands out unique display names and keeps track of the longest enabled one.
///
/// Names that collide get the smallest free numeric suffix: `h`, `h#1`, `h#2`. Releasing
/// `h#1` leaves a hole that the next `h` fills. Releasing the highest suffix also drops
/// the holes below it, and the base name itself once nothing uses it.
///
/// The maximum length is derived from a count of enabled names per length, so enabling,
/// disabling or renaming one shell never scans all of them. [`take_max_changed()`] tells
/// the owner when the remote terminal widths must be recomputed.
///
/// [`take_max_changed()`]: Self::take_max_changed
#[derive(Debug, Default)]
pub struct DisplayNames {
    /// Base name to suffix slots, `false` is a hole left by a release.
    suffixes: HashMap<String, Vec<bool>>,
    nr_enabled_by_length: BTreeMap<usize, usize>,
    max_display_name_length: usize,
    max_changed: bool,
}

impl DisplayNames {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn max_display_name_length(&self) -> usize { self.max_display_name_length }

    /// `true` once after the maximum enabled name length changed.
    pub fn take_max_changed(&mut self) -> bool { std::mem::take(&mut self.max_changed) }

    /// Replaces `prev` (if any) with a unique name derived from `new_base` (if any).
    /// The new name counts as enabled, the previous one stops counting.
    ///
    /// ```
    /// # use r3bl_fanout::DisplayNames;
    /// let mut names = DisplayNames::new();
    /// let first = names.change(None, Some("h")).unwrap();
    /// let second = names.change(None, Some("h")).unwrap();
    /// assert_eq!((first.as_deref(), second.as_deref()), (Some("h"), Some("h#1")));
    /// ```
    ///
    /// # Errors
    ///
    /// [`DisplayNameError::ContainsSeparator`] if `new_base` contains `#`. Nothing is
    /// changed in that case.
    pub fn change(
        &mut self,
        prev: Option<&str>,
        new_base: Option<&str>,
    ) -> Result<Option<String>, DisplayNameError> {
        if let Some(base) = new_base.filter(|base| base.contains(SUFFIX_SEPARATOR)) {
            return Err(DisplayNameError::ContainsSeparator(base.to_string()));
        }

        if let Some(prev) = prev {
            if new_base.is_some() {
                self.set_enabled(prev, false);
            }
            self.release(prev);
        }

        let Some(base) = new_base else {
            return Ok(None);
        };
        let name = self.acquire(base);
        self.set_enabled(&name, true);
        Ok(Some(name))
    }

    /// Counts `name` in (or out of) the maximum length computation.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        let length = name.chars().count();
        if enabled {
            *self.nr_enabled_by_length.entry(length).or_default() += 1;
        } else if let Some(count) = self.nr_enabled_by_length.get_mut(&length) {
            *count -= 1;
            if *count == 0 {
                self.nr_enabled_by_length.remove(&length);
            }
        } else {
            tracing::warn!(message = "disabled a name that was not enabled", name);
        }

        let new_max = self
            .nr_enabled_by_length
            .last_key_value()
            .map_or(0, |(length, _)| *length);
        if new_max != self.max_display_name_length {
            self.max_display_name_length = new_max;
            self.max_changed = true;
        }
    }

    fn acquire(&mut self, base: &str) -> String {
        let slots = self.suffixes.entry(base.to_string()).or_default();
        let index = match slots.iter().position(|used| !used) {
            Some(hole) => {
                slots[hole] = true;
                hole
            }
            None => {
                slots.push(true);
                slots.len() - 1
            }
        };

        if index == 0 {
            base.to_string()
        } else {
            format!("{base}{SUFFIX_SEPARATOR}{index}")
        }
    }

    fn release(&mut self, name: &str) {
        let (base, index) = match name.split_once(SUFFIX_SEPARATOR) {
            Some((base, suffix)) => {
                let Ok(index) = suffix.parse::<usize>() else {
                    return;
                };
                (base, index)
            }
            None => (name, 0),
        };
        let Some(slots) = self.suffixes.get_mut(base) else {
            return;
        };

        if index + 1 < slots.len() {
            slots[index] = false;
            return;
        }

        slots.truncate(index);
        while slots.last() == Some(&false) {
            slots.pop();
        }
        if slots.is_empty() {
            self.suffixes.remove(base);
        }
    }
}
