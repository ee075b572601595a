// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// SGR codes used for the name prefix: bold, then the 7 basic foreground colors.
pub const PREFIX_COLORS: [u8; 8] = [1, 30, 31, 32, 33, 34, 35, 36];

/// Color of the `nth` session that gets one. The palette is walked backwards, so the
/// first shell is cyan, the next magenta, and so on.
#[must_use]
pub fn prefix_color_for(nth: usize) -> u8 {
    PREFIX_COLORS[PREFIX_COLORS.len() - 1 - nth % PREFIX_COLORS.len()]
}

/// `\x1b[1;<code>m<prefix>\x1b[1;m`.
#[must_use]
pub fn colorize_prefix(prefix: &[u8], code: u8) -> Vec<u8> {
    let mut acc = format!("\x1b[1;{code}m").into_bytes();
    acc.extend_from_slice(prefix);
    acc.extend_from_slice(b"\x1b[1;m");
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_colors_rotate_backwards_and_wrap() {
        let codes: Vec<u8> = (0..10).map(prefix_color_for).collect();
        assert_eq!(codes, vec![36, 35, 34, 33, 32, 31, 30, 1, 36, 35]);
    }

    #[test]
    fn test_colorize_prefix() {
        assert_eq!(colorize_prefix(b"web1 : ", 32), b"\x1b[1;32mweb1 : \x1b[1;m".to_vec());
    }
}
