// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{BridgeEvent, BridgeRequest, BridgeShared, CompletionSnapshot, EventSink,
            FanoutLineHelper, InputBridgeError};
use crate::Continuation;
use rustyline::{Cmd, CompletionType, Config, ConditionalEventHandler, Editor, Event,
                EventContext, EventHandler, ExternalPrinter, KeyEvent, RepeatCount,
                error::ReadlineError, history::DefaultHistory};
use std::{path::PathBuf,
          sync::{Arc, mpsc::Receiver}};

/// Number of lines kept in the history file.
pub const HISTORY_SIZE_MAX: usize = 1000;

const DEBUG_INPUT_BRIDGE: bool = false;

pub type FanoutEditor = Editor<FanoutLineHelper, DefaultHistory>;

/// Printer used to wake the editor while it waits for a key.
pub type EditorWakeup = Box<dyn ExternalPrinter + Send>;

/// Builds the editor. Must run on the bridge thread: creating it installs the editor's
/// `SIGWINCH` handler, and the reactor's own handler is registered after it.
///
/// # Errors
///
/// If the terminal can't be set up.
pub fn create_editor(
    completion: CompletionSnapshot,
    shared: Arc<BridgeShared>,
    sink: EventSink,
    history_path: Option<&PathBuf>,
) -> Result<(FanoutEditor, EditorWakeup), InputBridgeError> {
    let to_error = |err: ReadlineError| InputBridgeError::Editor(err.to_string());

    let config = Config::builder()
        .max_history_size(HISTORY_SIZE_MAX)
        .map_err(to_error)?
        .auto_add_history(false)
        .completion_type(CompletionType::List)
        .build();
    let mut editor = FanoutEditor::with_config(config).map_err(to_error)?;

    editor.set_helper(Some(FanoutLineHelper {
        completion,
        shared: shared.clone(),
    }));
    editor.bind_sequence(
        KeyEvent::ctrl('\\'),
        EventHandler::Conditional(Box::new(ControlByteHandler {
            shared: shared.clone(),
            sink,
        })),
    );
    editor.bind_sequence(
        KeyEvent::ctrl('Z'),
        EventHandler::Conditional(Box::new(CtrlZHandler { shared })),
    );

    if let Some(path) = history_path
        && path.exists()
        && let Err(err) = editor.load_history(path)
    {
        tracing::warn!(message = "failed to load history", ?path, ?err);
    }

    let wakeup = editor.create_external_printer().map_err(to_error)?;
    Ok((editor, Box::new(wakeup)))
}

/// Runs on the bridge thread until [`BridgeRequest::Shutdown`] or until the reactor
/// goes away.
pub fn run_bridge_loop(
    mut editor: FanoutEditor,
    requests: &Receiver<BridgeRequest>,
    sink: &EventSink,
    shared: &BridgeShared,
    history_path: Option<&PathBuf>,
) {
    loop {
        let Ok(request) = requests.recv() else {
            break;
        };
        let BridgeRequest::ReadLine {
            prompt,
            initial_text,
            masked,
        } = request
        else {
            break;
        };

        BridgeShared::set(&shared.masked, masked);
        let maybe_event = read_one_line(&mut editor, &prompt, &initial_text, shared, sink);
        BridgeShared::set(&shared.masked, false);

        let Some(event) = maybe_event else {
            continue;
        };
        if let BridgeEvent::Line(line) = &event
            && !masked
        {
            remember_line(&mut editor, line, history_path);
        }

        DEBUG_INPUT_BRIDGE.then(|| tracing::debug!(message = "bridge event", ?event));
        if let Continuation::Stop = send_or_stop(sink, event) {
            break;
        }
    }
}

fn send_or_stop(sink: &EventSink, event: BridgeEvent) -> Continuation {
    if sink.send(event) {
        Continuation::Continue
    } else {
        Continuation::Stop
    }
}

/// One `readline()`. `None` when the reactor interrupted it, which was already
/// reported through [`BridgeEvent::ControlByteConsumed`].
fn read_one_line(
    editor: &mut FanoutEditor,
    prompt: &str,
    initial_text: &str,
    shared: &BridgeShared,
    sink: &EventSink,
) -> Option<BridgeEvent> {
    BridgeShared::set(&shared.in_readline, true);
    let result = editor.readline_with_initial(prompt, (initial_text, ""));
    BridgeShared::set(&shared.in_readline, false);

    if BridgeShared::take(&shared.control_byte_consumed) {
        return None;
    }

    match result {
        Ok(line) => Some(BridgeEvent::Line(line)),
        Err(ReadlineError::Interrupted) => {
            if BridgeShared::take(&shared.ctrl_z_pressed) {
                Some(BridgeEvent::CtrlZ)
            } else {
                Some(BridgeEvent::CtrlC)
            }
        }
        Err(ReadlineError::Eof) => Some(BridgeEvent::Eof),
        // Stdin was swapped for the pipe before the editor could read the terminal
        // attributes.
        Err(err) if BridgeShared::flag(&shared.interrupt_requested) => {
            tracing::debug!(message = "readline interrupted during setup", ?err);
            sink.send(BridgeEvent::ControlByteConsumed {
                partial: initial_text.to_string(),
            });
            shared.wait_for_resume();
            None
        }
        Err(err) => Some(BridgeEvent::Failed(err.to_string())),
    }
}

fn remember_line(editor: &mut FanoutEditor, line: &str, history_path: Option<&PathBuf>) {
    if line.trim().is_empty() {
        return;
    }
    if let Some(helper) = editor.helper_mut() {
        helper.completion.lock().add_history_words(line);
    }
    if let Err(err) = editor.add_history_entry(line) {
        tracing::warn!(message = "failed to add history entry", ?err);
    }
    if let Some(path) = history_path
        && let Err(err) = editor.save_history(path)
    {
        tracing::warn!(message = "failed to save history", ?path, ?err);
    }
}

/// Bound to `Ctrl-\`. When the reactor armed stdin, reports the partial line, waits
/// until stdin is back, then ends `readline()`.
struct ControlByteHandler {
    shared: Arc<BridgeShared>,
    sink: EventSink,
}

impl ConditionalEventHandler for ControlByteHandler {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if !BridgeShared::flag(&self.shared.interrupt_requested) {
            // Typed by the user.
            return Some(Cmd::Noop);
        }
        BridgeShared::set(&self.shared.control_byte_consumed, true);
        self.sink.send(BridgeEvent::ControlByteConsumed {
            partial: ctx.line().to_string(),
        });
        self.shared.wait_for_resume();
        Some(Cmd::Interrupt)
    }
}

/// Bound to `Ctrl-Z`, which would otherwise suspend the whole process group.
struct CtrlZHandler {
    shared: Arc<BridgeShared>,
}

impl ConditionalEventHandler for CtrlZHandler {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        _ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        BridgeShared::set(&self.shared.ctrl_z_pressed, true);
        Some(Cmd::Interrupt)
    }
}
