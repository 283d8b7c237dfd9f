use std::fmt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::events::Event;
use crate::request::{CredentialId, CredentialResponse};
use crate::status::AuthStatus;

/// Identifies one request in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the user did with the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Selected(CredentialId),
    /// Chose to use another device.
    Hybrid,
    Dismissed,
}

/// Handed to the picker so it can report the user's choice.
#[derive(Debug, Clone)]
pub struct SelectionSender {
    id: RequestId,
    events: mpsc::UnboundedSender<Event>,
}

impl SelectionSender {
    pub(crate) fn new(id: RequestId, events: mpsc::UnboundedSender<Event>) -> Self {
        Self { id, events }
    }

    pub fn request_id(&self) -> RequestId {
        self.id
    }

    pub fn select(&self, credential_id: CredentialId) {
        self.send(PickerEvent::Selected(credential_id));
    }

    pub fn hybrid(&self) {
        self.send(PickerEvent::Hybrid);
    }

    pub fn dismiss(&self) {
        self.send(PickerEvent::Dismissed);
    }

    fn send(&self, event: PickerEvent) {
        if self.events.send(Event::Picker(event)).is_err() {
            tracing::debug!(request_id = %self.id, "Picker event after request finished");
        }
    }
}

/// Cancels a request from anywhere, independent of its [`RequestHandle`].
#[derive(Debug, Clone)]
pub struct Canceller {
    id: RequestId,
    events: mpsc::UnboundedSender<Event>,
}

impl Canceller {
    pub fn cancel(&self) {
        if self.events.send(Event::Cancel).is_err() {
            tracing::debug!(request_id = %self.id, "Cancel after request finished");
        }
    }
}

/// The caller's end of one in-flight request.
#[derive(Debug)]
pub struct RequestHandle {
    id: RequestId,
    events: mpsc::UnboundedSender<Event>,
    response: oneshot::Receiver<Result<CredentialResponse, AuthStatus>>,
}

impl RequestHandle {
    pub(crate) fn new(
        id: RequestId,
        events: mpsc::UnboundedSender<Event>,
        response: oneshot::Receiver<Result<CredentialResponse, AuthStatus>>,
    ) -> Self {
        Self {
            id,
            events,
            response,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Advisory: a picker session is torn down, an outstanding backend call
    /// is not interrupted and decides once it replies.
    pub fn cancel(&self) {
        self.canceller().cancel();
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            id: self.id,
            events: self.events.clone(),
        }
    }

    /// Wait for the request's single terminal result.
    pub async fn response(self) -> Result<CredentialResponse, AuthStatus> {
        self.response.await.unwrap_or_else(|_| {
            tracing::error!(request_id = %self.id, "Request ended without a result");
            Err(AuthStatus::UnknownError)
        })
    }
}
