// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words unsetopt ctlecho onlcr RPROMPT precmd HISTFILE

//! Commands typed into a freshly started remote shell so its output can be framed.

use crate::MarkerParts;

/// Line editing off, no echo of what we send, no `\r\n` translation.
pub const TTY_SETUP: &[u8] = b"unsetopt zle 2> /dev/null;stty -echo -onlcr -ctlecho;";

/// Every prompt but `PS1` is emptied, and nothing runs before a prompt is drawn.
pub const PROMPT_SETUP: &[u8] =
    b"PS2=;RPS1=;RPROMPT=;PROMPT_COMMAND=;TERM=ansi;unset precmd_functions;unset HISTFILE;";

/// `PS1="p1""p2\n"\n`: the prompt becomes the marker alone on its line.
#[must_use]
pub fn prompt_assignment(prompt: &MarkerParts) -> Vec<u8> {
    let mut acc = b"PS1=\"".to_vec();
    acc.extend_from_slice(&prompt.first);
    acc.extend_from_slice(b"\"\"");
    acc.extend_from_slice(&prompt.second);
    acc.extend_from_slice(b"\\n\"\n");
    acc
}

/// Sent once to every new shell, after the first pass over its output.
#[must_use]
pub fn build_init_string(prompt: &MarkerParts) -> Vec<u8> {
    [TTY_SETUP, PROMPT_SETUP, &prompt_assignment(prompt)].concat()
}

/// `/bin/echo "m1""m2"<tail>\n`. The remote shell expands `tail`, the echoed line is
/// the full marker followed by the expansion.
#[must_use]
pub fn marker_echo_command(marker: &MarkerParts, tail: &[u8]) -> Vec<u8> {
    let mut acc = b"/bin/echo ".to_vec();
    acc.extend_from_slice(&marker.to_quoted_words());
    acc.extend_from_slice(tail);
    acc.push(b'\n');
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MarkerBytes, find_subslice};
    use pretty_assertions::assert_eq;

    fn parts() -> MarkerParts {
        MarkerParts {
            first: MarkerBytes::from_slice(b"fan"),
            second: MarkerBytes::from_slice(b"out-x:p:1/"),
        }
    }

    #[test]
    fn test_prompt_assignment() {
        assert_eq!(
            String::from_utf8(prompt_assignment(&parts())).unwrap(),
            "PS1=\"fan\"\"out-x:p:1/\\n\"\n"
        );
    }

    #[test]
    fn test_init_string_ends_with_the_prompt() {
        let init = build_init_string(&parts());
        assert!(init.starts_with(b"unsetopt zle 2> /dev/null;stty -echo -onlcr -ctlecho;"));
        assert!(init.ends_with(&prompt_assignment(&parts())));
        assert_eq!(find_subslice(&init, &parts().joined()), None);
    }

    #[test]
    fn test_marker_echo_command() {
        assert_eq!(
            marker_echo_command(&parts(), b"web-$HOSTNAME"),
            b"/bin/echo \"fan\"\"out-x:p:1/\"web-$HOSTNAME\n".to_vec()
        );
    }
}
