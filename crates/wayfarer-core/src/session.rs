//! Session state container
//!
//! [`Session`] owns the transcript and the flags a UI renders from, and is
//! the only thing that mutates them. Renderers call [`Session::subscribe`]
//! and redraw whenever a [`SessionEvent`] arrives.
//!
//! Backend calls are split in two phases so an event loop can run the
//! network part on a task: [`Session::submit`] hands out a [`ChatTicket`]
//! that [`Session::resolve_chat`] later completes, and likewise
//! [`Session::begin_probe`] / [`Session::resolve_probe`].

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::gateway::{ChatBackend, HealthOutcome};
use crate::message::{Message, MessageId};

const EVENT_CAPACITY: usize = 64;

/// Reachability of the chat backend as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStatus {
    #[default]
    Checking,
    Ready,
    Error,
}

impl BackendStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendStatus::Checking => "Checking",
            BackendStatus::Ready => "Online",
            BackendStatus::Error => "Error",
        }
    }
}

/// Change notification published after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    InFlightChanged(bool),
    ErrorChanged(Option<String>),
    StatusChanged(BackendStatus),
    InputChanged,
}

/// Handle for an accepted chat submission.
///
/// Names the user message the eventual reply answers. Only the ticket for
/// the outstanding request is accepted by [`Session::resolve_chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    id: MessageId,
    text: String,
}

impl ChatTicket {
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Trimmed text that was sent.
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorOrigin {
    Probe,
    Chat,
}

/// Read-only view of everything a renderer needs.
#[derive(Debug, Default)]
pub struct SessionState {
    transcript: Vec<Message>,
    pending_input: String,
    in_flight: Option<MessageId>,
    last_error: Option<String>,
    backend_status: BackendStatus,
}

impl SessionState {
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.backend_status
    }
}

pub struct Session {
    state: SessionState,
    error_origin: Option<ErrorOrigin>,
    probing: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: SessionState::default(),
            error_origin: None,
            probing: false,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Edit the pending input in place.
    pub fn update_input(&mut self, edit: impl FnOnce(&mut String)) {
        edit(&mut self.state.pending_input);
        self.publish(SessionEvent::InputChanged);
    }

    /// Mark the backend as being checked. Returns false if a probe is
    /// already outstanding, in which case nothing changes.
    pub fn begin_probe(&mut self) -> bool {
        if self.probing {
            debug!("probe already outstanding");
            return false;
        }
        self.probing = true;
        self.set_status(BackendStatus::Checking);
        true
    }

    pub fn resolve_probe(&mut self, outcome: HealthOutcome) {
        self.probing = false;
        match outcome {
            HealthOutcome::Ready => {
                info!("backend ready");
                self.set_status(BackendStatus::Ready);
                if self.error_origin == Some(ErrorOrigin::Probe) {
                    self.clear_error();
                }
            }
            HealthOutcome::NotReady(reason) => {
                warn!(%reason, "backend not ready");
                self.set_status(BackendStatus::Error);
                self.set_error(
                    format!("Backend configuration issue: {}", reason),
                    ErrorOrigin::Probe,
                );
            }
            HealthOutcome::Unreachable(err) => {
                warn!(error = %err, "backend unreachable");
                self.set_status(BackendStatus::Error);
                self.set_error(err.to_string(), ErrorOrigin::Probe);
            }
        }
    }

    /// Probe the backend once and record the outcome.
    pub async fn probe(&mut self, backend: &dyn ChatBackend) {
        if self.begin_probe() {
            let outcome = backend.check_health().await;
            self.resolve_probe(outcome);
        }
    }

    /// Accept `text` for sending.
    ///
    /// Returns `None` without touching any state when the text is blank or a
    /// request is already in flight. Otherwise the user message is in the
    /// transcript and the in-flight flag is set when this returns.
    pub fn submit(&mut self, text: &str) -> Option<ChatTicket> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank submission");
            return None;
        }
        if self.state.is_in_flight() {
            debug!("ignoring submission while a request is in flight");
            return None;
        }

        let id = MessageId::generate();
        self.append(Message::user(id.clone(), text));

        if !self.state.pending_input.is_empty() {
            self.state.pending_input.clear();
            self.publish(SessionEvent::InputChanged);
        }

        self.state.in_flight = Some(id.clone());
        self.publish(SessionEvent::InFlightChanged(true));

        self.clear_error();

        debug!(id = %id, "chat submitted");
        Some(ChatTicket {
            id,
            text: text.to_string(),
        })
    }

    /// Submit whatever is in the pending input. A refused submission leaves
    /// the input as it was.
    pub fn submit_pending(&mut self) -> Option<ChatTicket> {
        let text = self.state.pending_input.clone();
        self.submit(&text)
    }

    /// Complete the outstanding request with the backend's answer.
    ///
    /// Returns false and changes nothing if `ticket` is not the request
    /// currently in flight.
    pub fn resolve_chat(&mut self, ticket: ChatTicket, result: Result<String, ChatError>) -> bool {
        if self.state.in_flight.as_ref() != Some(&ticket.id) {
            warn!(id = %ticket.id, "dropping reply for a request that is not in flight");
            return false;
        }

        match result {
            Ok(reply) => {
                debug!(id = %ticket.id, "chat reply appended");
                self.append(Message::bot(ticket.id.reply(), reply));
            }
            Err(err) => {
                let message = err.to_string();
                warn!(id = %ticket.id, error = %message, "chat request failed");
                self.set_error(message.clone(), ErrorOrigin::Chat);
                self.append(Message::bot(
                    ticket.id.error_reply(),
                    format!("Error: {}", message),
                ));
            }
        }

        self.state.in_flight = None;
        self.publish(SessionEvent::InFlightChanged(false));
        true
    }

    /// Submit `text` and wait for the backend. Returns false if the
    /// submission was refused.
    pub async fn send(&mut self, backend: &dyn ChatBackend, text: &str) -> bool {
        let Some(ticket) = self.submit(text) else {
            return false;
        };
        let result = backend.send_chat(ticket.text()).await;
        self.resolve_chat(ticket, result)
    }

    fn append(&mut self, message: Message) {
        self.state.transcript.push(message.clone());
        self.publish(SessionEvent::MessageAppended(message));
    }

    fn set_status(&mut self, status: BackendStatus) {
        if self.state.backend_status != status {
            self.state.backend_status = status;
            self.publish(SessionEvent::StatusChanged(status));
        }
    }

    fn set_error(&mut self, message: String, origin: ErrorOrigin) {
        self.state.last_error = Some(message.clone());
        self.error_origin = Some(origin);
        self.publish(SessionEvent::ErrorChanged(Some(message)));
    }

    fn clear_error(&mut self) {
        self.error_origin = None;
        if self.state.last_error.take().is_some() {
            self.publish(SessionEvent::ErrorChanged(None));
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine; the state is still authoritative.
        let _ = self.events.send(event);
    }
}
