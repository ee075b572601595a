// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{ControlCommandError, handlers};
use crate::{CompletionData, FanoutState, LoopControl, ShellEntry, complete_local_path,
            complete_shells};
use std::path::Path;

pub type ExecuteFn = fn(&mut FanoutState, &str) -> Result<LoopControl, ControlCommandError>;

/// Completes the argument being typed: `line` is the line up to the cursor, `text` the
/// word under the cursor.
pub type CompleteFn = fn(&CompletionData, &str, &str) -> Vec<String>;

/// A `:name` command typed at the prompt.
#[derive(Debug, Clone, Copy)]
pub struct ControlCommand {
    pub name: &'static str,
    pub execute: ExecuteFn,
    pub complete: CompleteFn,
}

/// Sorted by name, which is the order they are completed in.
pub const CONTROL_COMMANDS: &[ControlCommand] = &[
    ControlCommand {
        name: "add",
        execute: handlers::add,
        complete: complete_nothing,
    },
    ControlCommand {
        name: "chdir",
        execute: handlers::chdir,
        complete: complete_directory,
    },
    ControlCommand {
        name: "disable",
        execute: handlers::disable,
        complete: complete_live_shells,
    },
    ControlCommand {
        name: "enable",
        execute: handlers::enable,
        complete: complete_live_shells,
    },
    ControlCommand {
        name: "export_vars",
        execute: handlers::export_vars,
        complete: complete_nothing,
    },
    ControlCommand {
        name: "hide_password",
        execute: handlers::hide_password,
        complete: complete_nothing,
    },
    ControlCommand {
        name: "list",
        execute: handlers::list,
        complete: complete_any_shell,
    },
    ControlCommand {
        name: "purge",
        execute: handlers::purge,
        complete: complete_disabled_shells,
    },
    ControlCommand {
        name: "quit",
        execute: handlers::quit,
        complete: complete_nothing,
    },
    ControlCommand {
        name: "reconnect",
        execute: handlers::reconnect,
        complete: complete_dead_shells,
    },
    ControlCommand {
        name: "rename",
        execute: handlers::rename,
        complete: complete_nothing,
    },
    ControlCommand {
        name: "reset_prompt",
        execute: handlers::reset_prompt,
        complete: complete_enabled_shells,
    },
    ControlCommand {
        name: "send_ctrl",
        execute: handlers::send_ctrl,
        complete: complete_send_ctrl,
    },
    ControlCommand {
        name: "set_debug",
        execute: handlers::set_debug,
        complete: complete_set_debug,
    },
    ControlCommand {
        name: "set_log",
        execute: handlers::set_log,
        complete: complete_set_log,
    },
    ControlCommand {
        name: "show_read_buffer",
        execute: handlers::show_read_buffer,
        complete: complete_buffered_shells,
    },
];

#[must_use]
pub fn find_control_command(name: &str) -> Option<&'static ControlCommand> {
    CONTROL_COMMANDS.iter().find(|command| command.name == name)
}

/// Runs `line` (what followed the `:`). Errors are printed, only `:quit` leaves the
/// reactor.
pub fn run_control_command(state: &mut FanoutState, line: &str) -> LoopControl {
    let Some(name) = line.split_whitespace().next() else {
        return LoopControl::Continue;
    };
    let result = match find_control_command(name) {
        Some(command) => {
            let params = line
                .trim_start()
                .get(name.len() + 1..)
                .unwrap_or_default();
            (command.execute)(state, params)
        }
        None => Err(ControlCommandError::Unknown(name.to_string())),
    };
    match result {
        Ok(control) => control,
        Err(err) => {
            tracing::debug!(message = "control command failed", %err);
            state.output(format!("{err}\n").as_bytes());
            LoopControl::Continue
        }
    }
}

/// Completion for a line starting with `:`. The first word completes to `:name `, the
/// following ones are completed by the command itself.
#[must_use]
pub fn complete_control_command(
    before_cursor: &str,
    text: &str,
    start: usize,
    data: &CompletionData,
) -> Vec<String> {
    if start == 0 {
        let prefix = text.strip_prefix(':').unwrap_or(text);
        return CONTROL_COMMANDS
            .iter()
            .filter(|command| command.name.starts_with(prefix))
            .map(|command| format!(":{} ", command.name))
            .collect();
    }
    before_cursor
        .split_whitespace()
        .next()
        .and_then(|word| word.strip_prefix(':'))
        .and_then(find_control_command)
        .map_or_else(Vec::new, |command| (command.complete)(data, before_cursor, text))
}

fn complete_nothing(_: &CompletionData, _: &str, _: &str) -> Vec<String> { Vec::new() }

fn complete_any_shell(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |_| true)
}

fn complete_live_shells(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |shell| !shell.dead)
}

fn complete_dead_shells(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |shell| shell.dead)
}

fn complete_enabled_shells(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |shell| shell.enabled)
}

fn complete_disabled_shells(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |shell| !shell.enabled)
}

fn complete_buffered_shells(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    complete_shells(data, line, text, |shell: &ShellEntry| shell.has_buffered_output)
}

fn complete_directory(_: &CompletionData, _: &str, text: &str) -> Vec<String> {
    complete_local_path(text)
        .into_iter()
        .filter(|path| Path::new(path).is_dir())
        .collect()
}

fn complete_set_log(_: &CompletionData, _: &str, text: &str) -> Vec<String> {
    complete_local_path(text)
}

/// `true` once the word after the command name is complete.
fn has_first_argument(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next_back();
    chars.as_str().split_whitespace().count() >= 2
}

fn complete_send_ctrl(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    if has_first_argument(line) {
        return complete_enabled_shells(data, line, text);
    }
    match text {
        "c" | "d" | "z" => vec![format!("{text} ")],
        _ => vec!["c ".to_string(), "d ".to_string(), "z ".to_string()],
    }
}

fn complete_set_debug(data: &CompletionData, line: &str, text: &str) -> Vec<String> {
    if has_first_argument(line) {
        return complete_any_shell(data, line, text);
    }
    if text.eq_ignore_ascii_case("y") || text.eq_ignore_ascii_case("n") {
        return vec![format!("{text} ")];
    }
    vec!["y ".to_string(), "n ".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data() -> CompletionData {
        let shell = |name: &str, enabled: bool, dead: bool| ShellEntry {
            name: name.to_string(),
            enabled,
            dead,
            has_buffered_output: false,
        };
        CompletionData {
            shells: vec![
                shell("db1", true, false),
                shell("web1", true, false),
                shell("web2", false, false),
                shell("web3", false, true),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        let names: Vec<&str> = CONTROL_COMMANDS.iter().map(|command| command.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_complete_command_names() {
        assert_eq!(
            complete_control_command(":s", ":s", 0, &data()),
            vec![":send_ctrl ", ":set_debug ", ":set_log ", ":show_read_buffer "]
        );
        assert_eq!(complete_control_command(":", ":", 0, &data()).len(), 16);
    }

    #[test]
    fn test_complete_arguments_per_command() {
        let data = data();
        assert_eq!(
            complete_control_command(":enable w", "w", 8, &data),
            vec!["web1 ", "web2 "]
        );
        assert_eq!(
            complete_control_command(":reconnect ", "", 11, &data),
            vec!["web3 "]
        );
        assert_eq!(
            complete_control_command(":purge ", "", 7, &data),
            vec!["web2 ", "web3 "]
        );
        assert_eq!(
            complete_control_command(":enable web1 w", "w", 13, &data),
            vec!["web2 "]
        );
        assert!(complete_control_command(":nope ", "", 6, &data).is_empty());
    }

    #[test]
    fn test_complete_send_ctrl_and_set_debug() {
        let data = data();
        assert_eq!(
            complete_control_command(":send_ctrl ", "", 11, &data),
            vec!["c ", "d ", "z "]
        );
        assert_eq!(complete_control_command(":send_ctrl d", "d", 11, &data), vec!["d "]);
        assert_eq!(
            complete_control_command(":send_ctrl c ", "", 13, &data),
            vec!["db1 ", "web1 "]
        );
        assert_eq!(complete_control_command(":set_debug Y", "Y", 11, &data), vec!["Y "]);
        assert_eq!(
            complete_control_command(":set_debug y d", "d", 13, &data),
            vec!["db1 "]
        );
    }
}
