// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{ControlCommandError, run_control_command};
use crate::{FanoutState, LoopControl};
use std::{os::unix::process::ExitStatusExt, process::Command};

/// Handles one line typed by the user, `\n` included:
/// - `:cmd args` runs a control command,
/// - `!cmd` runs `cmd` locally,
/// - anything else is sent to every enabled shell.
pub fn process_input(state: &mut FanoutState, line: &str) -> LoopControl {
    state.console.log(format!("> {line}").as_bytes());

    if let Some(control) = line.strip_prefix(':') {
        return run_control_command(state, control.strip_suffix('\n').unwrap_or(control));
    }

    if let Some(command) = line.strip_prefix('!') {
        if let Err(err) = run_local_command(state, command) {
            state.output(format!("{err}\n").as_bytes());
        }
        return LoopControl::Continue;
    }

    let ids = state.registry.all_ids();
    state.for_each_session(&ids, |session, env| {
        session.dispatch_command(line.as_bytes(), env);
    });
    LoopControl::Continue
}

/// Runs `command` with `/bin/sh -c` on the local machine, in the foreground, and
/// reports a non-zero exit.
///
/// # Errors
///
/// If the shell can't be started.
pub fn run_local_command(state: &mut FanoutState, command: &str) -> Result<(), ControlCommandError> {
    let status = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|source| ControlCommandError::LocalCommand {
            command: command.trim_end().to_string(),
            source,
        })?;

    // A shell reports a child killed by signal N as 128 + N.
    let retcode = match (status.code(), status.signal()) {
        (Some(code), _) if (129..=192).contains(&code) => 128 - code,
        (Some(code), _) => code,
        (None, Some(signal)) => -signal,
        (None, None) => 0,
    };
    if retcode > 0 {
        state.output(format!("Child returned {retcode}\n").as_bytes());
    } else if retcode < 0 {
        state.output(format!("Child was terminated by signal {}\n", -retcode).as_bytes());
    }
    Ok(())
}
