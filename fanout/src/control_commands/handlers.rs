// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! What each control command does. `params` is what followed the command name.

use super::ControlCommandError;
use crate::{FanoutState, LogFile, LoopControl, Session, SessionId, expand_host_args,
            expand_local_path, format_listing};
use std::path::PathBuf;
use strum_macros::EnumString;

type HandlerResult = Result<LoopControl, ControlCommandError>;

const CONTINUE: HandlerResult = Ok(LoopControl::Continue);

pub fn list(state: &mut FanoutState, params: &str) -> HandlerResult {
    let ids = state.select(params);
    let rows: Vec<Vec<Vec<u8>>> = ids
        .iter()
        .filter_map(|id| state.registry.get(*id))
        .map(Session::get_info)
        .collect();
    state.output(&format_listing(&rows));
    CONTINUE
}

pub fn quit(_: &mut FanoutState, _: &str) -> HandlerResult { Ok(LoopControl::Exit(0)) }

pub fn chdir(_: &mut FanoutState, params: &str) -> HandlerResult {
    let path = PathBuf::from(expand_local_path(params.trim()));
    std::env::set_current_dir(&path)
        .map_err(|source| ControlCommandError::ChangeDirectory { path, source })?;
    CONTINUE
}

/// `:send_ctrl <letter> [shells]`: `c` sends `^C` and so on.
pub fn send_ctrl(state: &mut FanoutState, params: &str) -> HandlerResult {
    let mut words = params.split_whitespace();
    let letter = words.next().ok_or(ControlCommandError::MissingLetter)?;
    let control_byte = control_byte_for(letter)
        .ok_or_else(|| ControlCommandError::NotASingleLetter(letter.to_string()))?;

    let patterns = words.collect::<Vec<_>>().join(" ");
    let ids = state.select(&patterns);
    state.for_each_session(&ids, |session, env| {
        if session.is_enabled() {
            session.dispatch_write(&[control_byte], env);
        }
    });
    CONTINUE
}

/// `c` or `C` is `0x03`.
fn control_byte_for(letter: &str) -> Option<u8> {
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_alphabetic() => u8::try_from(ch.to_ascii_lowercase())
            .ok()
            .map(|byte| byte - b'a' + 1),
        _ => None,
    }
}

pub fn reset_prompt(state: &mut FanoutState, params: &str) -> HandlerResult {
    let ids = state.select(params);
    state.for_each_session(&ids, Session::reset_prompt);
    CONTINUE
}

pub fn enable(state: &mut FanoutState, params: &str) -> HandlerResult {
    toggle_shells(state, params, true);
    CONTINUE
}

pub fn disable(state: &mut FanoutState, params: &str) -> HandlerResult {
    toggle_shells(state, params, false);
    CONTINUE
}

/// Enables or disables the selected shells. When that would change nothing, every other
/// shell is switched to the opposite state instead, so `:enable web1` twice in a row
/// leaves only `web1` enabled.
pub fn toggle_shells(state: &mut FanoutState, patterns: &str, enable: bool) {
    let selection = state.select(patterns);
    let patterns = patterns.trim();
    if !patterns.is_empty() && patterns != "*" && !selection.is_empty() {
        let no_effect = selection
            .iter()
            .filter_map(|id| state.registry.get(*id))
            .all(|session| session.is_dead() || session.is_enabled() == enable);
        if no_effect {
            toggle_shells(state, "*", !enable);
        }
    }
    state.for_each_session(&selection, |session, env| {
        if !session.is_dead() {
            session.set_enabled(enable, env);
        }
    });
}

/// Starts a new session for each selected dead one.
pub fn reconnect(state: &mut FanoutState, params: &str) -> HandlerResult {
    let dead: Vec<SessionId> = state
        .select(params)
        .into_iter()
        .filter(|id| state.registry.get(*id).is_some_and(Session::is_dead))
        .collect();
    let hosts: Vec<_> = dead
        .into_iter()
        .filter_map(|id| {
            state
                .registry
                .remove(id, &mut state.console, &mut state.options)
                .map(|session| session.host().clone())
        })
        .collect();
    state
        .registry
        .create(&hosts, &mut state.console, &mut state.options);
    CONTINUE
}

pub fn add(state: &mut FanoutState, params: &str) -> HandlerResult {
    let args: Vec<&str> = params.split_whitespace().collect();
    let hosts = expand_host_args(&args);
    state
        .registry
        .create(&hosts, &mut state.console, &mut state.options);
    CONTINUE
}

/// Removes the selected disabled shells.
pub fn purge(state: &mut FanoutState, params: &str) -> HandlerResult {
    let disabled: Vec<SessionId> = state
        .select(params)
        .into_iter()
        .filter(|id| state.registry.get(*id).is_some_and(|session| !session.is_enabled()))
        .collect();
    for id in disabled {
        state
            .registry
            .remove(id, &mut state.console, &mut state.options);
    }
    CONTINUE
}

pub fn rename(state: &mut FanoutState, params: &str) -> HandlerResult {
    let ids = state.enabled_ids();
    state.for_each_session(&ids, |session, env| session.rename(params, env));
    CONTINUE
}

/// Call before typing a password: it must not show up in debug output, the log file or
/// the history.
pub fn hide_password(state: &mut FanoutState, _: &str) -> HandlerResult {
    let ids = state.enabled_ids();
    let mut warned = false;
    state.for_each_session(&ids, |session, env| {
        if session.debug() {
            session.set_debug(false);
            if !warned {
                env.console
                    .output(b"Debugging disabled to avoid displaying passwords\n");
                warned = true;
            }
        }
    });
    state.mask_next_input = true;

    if state.console.log_file().is_some() {
        state.output(b"Logging disabled to avoid writing passwords\n");
        state.console.set_log_file(None);
    }
    CONTINUE
}

/// First argument of `:set_debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
enum DebugFlag {
    #[strum(serialize = "y")]
    On,
    #[strum(serialize = "n")]
    Off,
}

/// `:set_debug y|n [shells]`.
pub fn set_debug(state: &mut FanoutState, params: &str) -> HandlerResult {
    let mut words = params.split_whitespace();
    let letter = words.next().ok_or(ControlCommandError::MissingLetter)?;
    let flag: DebugFlag = letter
        .parse()
        .map_err(|_: strum::ParseError| ControlCommandError::NotYesOrNo(letter.to_string()))?;
    let patterns = words.collect::<Vec<_>>().join(" ");
    let ids = state.select(&patterns);
    state.for_each_session(&ids, |session, _| session.set_debug(flag == DebugFlag::On));
    CONTINUE
}

/// Exports `FANOUT_RANK`, `FANOUT_NAME`, `FANOUT_DISPLAY_NAME` and `FANOUT_NR_SHELLS`
/// in every enabled shell.
pub fn export_vars(state: &mut FanoutState, _: &str) -> HandlerResult {
    let ids = state.enabled_ids();
    for (rank, &id) in ids.iter().enumerate() {
        state.with_session(id, |session, env| {
            let vars = [
                ("FANOUT_RANK", rank.to_string()),
                ("FANOUT_NAME", session.host().hostname.clone()),
                ("FANOUT_DISPLAY_NAME", session.display_name().to_string()),
            ];
            for (name, value) in vars {
                let command = format!("export {name}={}\n", shell_words::quote(&value));
                session.dispatch_command(command.as_bytes(), env);
            }
        });
    }

    let command = format!("export FANOUT_NR_SHELLS={}\n", ids.len());
    let ids = state.enabled_ids();
    state.for_each_session(&ids, |session, env| {
        session.dispatch_command(command.as_bytes(), env);
    });
    CONTINUE
}

/// `:set_log <file>` appends the conversation to `file`, `:set_log` alone stops.
pub fn set_log(state: &mut FanoutState, params: &str) -> HandlerResult {
    let path = params.trim();
    if !path.is_empty() {
        let path = PathBuf::from(path);
        match LogFile::open_append(&path) {
            Ok(log_file) => {
                state.console.set_log_file(Some(log_file));
                return CONTINUE;
            }
            Err(source) => {
                let err = ControlCommandError::OpenLogFile { path, source };
                state.output(format!("{err}\n").as_bytes());
            }
        }
    }
    state.console.set_log_file(None);
    state.output(b"Logging disabled\n");
    CONTINUE
}

/// Prints what the selected shells printed before their first prompt.
pub fn show_read_buffer(state: &mut FanoutState, params: &str) -> HandlerResult {
    let ids = state.select(params);
    state.for_each_session(&ids, Session::show_read_buffer);
    CONTINUE
}
