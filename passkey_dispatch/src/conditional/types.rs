use thiserror::Error;

use crate::request::CredentialSummary;
use crate::status::AuthStatus;

/// Lifecycle of a picker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Security check outstanding.
    WaitingForRpValidation,
    /// Barrier armed, enumerating across one or two backends.
    WaitingForCredentialList,
    /// Candidates are shown; waiting for the user.
    WaitingForSelection,
    /// A chosen credential was dispatched and its reply is awaited.
    RequestSentToBackend,
    /// Cancelled while an enumeration or a backend call was outstanding.
    CancelPending,
    /// Cancelled while the security check was outstanding.
    CancelPendingValidationComplete,
}

impl SessionState {
    pub fn is_cancel_pending(self) -> bool {
        matches!(
            self,
            Self::CancelPending | Self::CancelPendingValidationComplete
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStep {
    Proceed,
    /// Cancelled during validation; no backend may be queried.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationStep {
    /// The other branch has not reported yet.
    Pending,
    Ready {
        legacy: Vec<CredentialSummary>,
        unified: Vec<CredentialSummary>,
    },
    Failed(AuthStatus),
    /// A cancel was waiting on this reply.
    Abort,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStep {
    /// Hand the reply to the caller.
    Deliver,
    /// The selection failed; the picker stays up for another choice.
    AwaitSelection,
    /// A cancel was waiting on this reply.
    Abort,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStep {
    /// Honored once the outstanding operation replies.
    Deferred,
    AbortNow { cleanup_picker: bool },
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Selection rejected in state {0:?}")]
pub struct SelectionRejected(pub SessionState);
