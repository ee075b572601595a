// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Substring helpers for raw terminal bytes. PTY output is not guaranteed to be UTF-8,
//! so line framing and marker matching work on `&[u8]`.

/// Returns the index of the first occurrence of `needle` in `haystack`.
///
/// An empty `needle` matches at index `0`.
#[must_use]
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[must_use]
pub fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    find_subslice(haystack, needle).is_some()
}

/// Same as [`contains_subslice`], ignoring ASCII case.
#[must_use]
pub fn contains_subslice_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
