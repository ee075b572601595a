// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{BridgeEvent, BridgeRequest, BridgeShared, CompletionSnapshot, EditorWakeup,
            EventSink, InputBridgeError, StdinRedirect, create_editor, run_bridge_loop};
use mio::Waker;
use std::{collections::VecDeque,
          path::PathBuf,
          sync::{Arc,
                 mpsc::{self, Receiver, RecvTimeoutError, Sender}},
          thread::{self, JoinHandle},
          time::Duration};

/// How long the reactor waits for the editor to give up `readline()`.
pub const INTERRUPT_ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Reactor side of the input bridge.
#[allow(missing_debug_implementations)]
pub struct InputBridge {
    requests: Sender<BridgeRequest>,
    events: Receiver<BridgeEvent>,
    shared: Arc<BridgeShared>,
    resume_tx: Sender<()>,
    wakeup: EditorWakeup,
    /// Events received while interrupting the editor, handed out first by
    /// [`try_recv()`](Self::try_recv).
    stashed: VecDeque<BridgeEvent>,
    completion: CompletionSnapshot,
    line_requested: bool,
    prompt_width: usize,
    thread: Option<JoinHandle<()>>,
}

impl InputBridge {
    /// Starts the bridge thread and waits until its editor is ready. Every event sent
    /// by the thread also wakes `waker`.
    ///
    /// # Errors
    ///
    /// If the thread can't be started or the editor can't be created.
    pub fn spawn(
        waker: Arc<Waker>,
        completion: CompletionSnapshot,
        history_path: Option<PathBuf>,
    ) -> Result<Self, InputBridgeError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        let (setup_tx, setup_rx) = mpsc::channel::<Result<EditorWakeup, InputBridgeError>>();

        let shared = Arc::new(BridgeShared::new(resume_rx));
        let sink = EventSink {
            tx: event_tx,
            waker,
        };

        let thread = thread::Builder::new()
            .name("input-bridge".into())
            .spawn({
                let shared = shared.clone();
                let completion = completion.clone();
                move || {
                    let setup = create_editor(
                        completion,
                        shared.clone(),
                        sink.clone(),
                        history_path.as_ref(),
                    );
                    match setup {
                        Ok((editor, wakeup)) => {
                            if setup_tx.send(Ok(wakeup)).is_ok() {
                                run_bridge_loop(
                                    editor,
                                    &request_rx,
                                    &sink,
                                    &shared,
                                    history_path.as_ref(),
                                );
                            }
                        }
                        Err(err) => {
                            setup_tx.send(Err(err)).ok();
                        }
                    }
                }
            })
            .map_err(InputBridgeError::ThreadSpawn)?;

        let wakeup = setup_rx
            .recv()
            .map_err(|_| InputBridgeError::SetupDisconnected)??;

        Ok(Self {
            requests: request_tx,
            events: event_rx,
            shared,
            resume_tx,
            wakeup,
            stashed: VecDeque::new(),
            completion,
            line_requested: false,
            prompt_width: 0,
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn completion(&self) -> &CompletionSnapshot { &self.completion }

    /// `true` between [`request_line()`] and the event that answers it.
    ///
    /// [`request_line()`]: Self::request_line
    #[must_use]
    pub fn is_line_requested(&self) -> bool { self.line_requested }

    /// Asks for the next line, and acknowledges the previous event. Returns `false` if
    /// the bridge thread is gone.
    pub fn request_line(&mut self, prompt: &str, initial_text: &str, masked: bool) -> bool {
        self.prompt_width = prompt.chars().count();
        let sent = self
            .requests
            .send(BridgeRequest::ReadLine {
                prompt: prompt.to_string(),
                initial_text: initial_text.to_string(),
                masked,
            })
            .is_ok();
        self.line_requested = sent;
        sent
    }

    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        let event = self
            .stashed
            .pop_front()
            .or_else(|| self.events.try_recv().ok())?;
        self.line_requested = false;
        Some(event)
    }

    /// Takes the editor out of `readline()` if it is in there. Returns the width of
    /// what it displayed (prompt and partial line), which the caller clears.
    ///
    /// The event that ended `readline()` is kept for [`try_recv()`]. It is
    /// [`BridgeEvent::ControlByteConsumed`] unless the user finished the line at the
    /// same moment.
    ///
    /// [`try_recv()`]: Self::try_recv
    pub fn interrupt_readline(&mut self) -> Option<usize> {
        if !self.line_requested || !BridgeShared::flag(&self.shared.in_readline) {
            return None;
        }

        BridgeShared::set(&self.shared.interrupt_requested, true);
        let redirect = match StdinRedirect::arm() {
            Ok(redirect) => redirect,
            Err(err) => {
                tracing::warn!(message = "failed to redirect stdin", ?err);
                BridgeShared::set(&self.shared.interrupt_requested, false);
                return None;
            }
        };
        if let Err(err) = self.wakeup.print(String::new()) {
            tracing::debug!(message = "failed to wake the editor", ?err);
        }

        let maybe_partial = self.wait_for_readline_exit();

        if let Err(err) = redirect.restore() {
            tracing::error!(message = "failed to restore stdin", ?err);
        }
        BridgeShared::set(&self.shared.interrupt_requested, false);

        let partial = maybe_partial?;
        // Lets the handler return, now that stdin is the terminal again.
        self.resume_tx.send(()).ok();
        Some(self.prompt_width + partial.chars().count())
    }

    /// The partial line if the editor gave up `readline()` because it was asked to.
    fn wait_for_readline_exit(&mut self) -> Option<String> {
        match self.events.recv_timeout(INTERRUPT_ACK_TIMEOUT) {
            Ok(event) => {
                self.line_requested = false;
                let partial = match &event {
                    BridgeEvent::ControlByteConsumed { partial } => Some(partial.clone()),
                    _ => None,
                };
                self.stashed.push_back(event);
                partial
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(message = "the editor did not leave readline in time");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stops the thread. It is only joined if it is not blocked in the editor.
    pub fn shutdown(mut self) {
        self.requests.send(BridgeRequest::Shutdown).ok();
        if let Some(thread) = self.thread.take()
            && !BridgeShared::flag(&self.shared.in_readline)
            && thread.join().is_err()
        {
            tracing::warn!(message = "input bridge thread panicked");
        }
    }
}
