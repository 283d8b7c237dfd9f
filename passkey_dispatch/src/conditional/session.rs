use super::types::{
    CancelStep, EnumerationStep, ReplyStep, SelectionRejected, SessionState, ValidationStep,
};
use crate::barrier::{Barrier, BarrierDecision, BarrierMode, Branch};
use crate::request::{CredentialId, CredentialSummary};
use crate::status::AuthStatus;

type CandidateList = Vec<CredentialSummary>;

/// State of one "enumerate, show a picker, dispatch the choice" interaction.
///
/// Owned by the request that created it and dropped when that request
/// delivers its terminal result.
#[derive(Debug)]
pub struct ConditionalSession {
    state: SessionState,
    barrier: Barrier<CandidateList, CandidateList>,
    /// Set when a cancel arrived while a backend call was outstanding, as
    /// opposed to an enumeration.
    cancel_requested_in_flight: bool,
    is_conditional: bool,
    candidates: CandidateList,
}

impl ConditionalSession {
    pub fn new(is_conditional: bool) -> Self {
        Self {
            state: SessionState::Idle,
            barrier: Barrier::new(),
            cancel_requested_in_flight: false,
            is_conditional,
            candidates: Vec::new(),
        }
    }

    /// A session created while the security check is still outstanding.
    pub fn awaiting_validation(is_conditional: bool) -> Self {
        Self {
            state: SessionState::WaitingForRpValidation,
            ..Self::new(is_conditional)
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_conditional(&self) -> bool {
        self.is_conditional
    }

    pub fn candidates(&self) -> &[CredentialSummary] {
        &self.candidates
    }

    pub fn candidate(&self, id: &CredentialId) -> Option<&CredentialSummary> {
        self.candidates.iter().find(|c| &c.credential_id == id)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "Session state transition");
        self.state = next;
    }

    pub fn on_validation_complete(&mut self) -> ValidationStep {
        match self.state {
            SessionState::CancelPendingValidationComplete => {
                self.transition(SessionState::Idle);
                ValidationStep::Abort
            }
            SessionState::WaitingForRpValidation => {
                self.transition(SessionState::Idle);
                ValidationStep::Proceed
            }
            state => {
                tracing::warn!(?state, "Validation completed outside of validation wait");
                ValidationStep::Proceed
            }
        }
    }

    /// Arm the barrier for a new enumeration.
    pub fn begin_enumeration(&mut self, mode: BarrierMode) {
        self.barrier.reset(mode);
        self.cancel_requested_in_flight = false;
        self.candidates.clear();
        self.transition(SessionState::WaitingForCredentialList);
    }

    pub fn on_enumeration(
        &mut self,
        branch: Branch,
        result: Result<CandidateList, AuthStatus>,
    ) -> EnumerationStep {
        let decision = match (branch, result) {
            (Branch::A, Ok(list)) => self.barrier.on_branch_a_success(list),
            (Branch::A, Err(status)) => self.barrier.on_branch_a_failure(status),
            (Branch::B, Ok(list)) => self.barrier.on_branch_b_success(list),
            (Branch::B, Err(status)) => self.barrier.on_branch_b_failure(status),
        };

        match self.state {
            SessionState::WaitingForCredentialList => match decision {
                None => EnumerationStep::Pending,
                Some(BarrierDecision::Both(legacy, unified)) => {
                    EnumerationStep::Ready { legacy, unified }
                }
                Some(BarrierDecision::BranchA(legacy)) => EnumerationStep::Ready {
                    legacy,
                    unified: Vec::new(),
                },
                Some(BarrierDecision::BranchB(unified)) => EnumerationStep::Ready {
                    legacy: Vec::new(),
                    unified,
                },
                Some(BarrierDecision::Failed(status)) => {
                    self.transition(SessionState::Idle);
                    EnumerationStep::Failed(status)
                }
                Some(BarrierDecision::Cancelled) => {
                    self.transition(SessionState::Idle);
                    EnumerationStep::Abort
                }
            },
            SessionState::CancelPending if !self.cancel_requested_in_flight => {
                self.transition(SessionState::Idle);
                EnumerationStep::Abort
            }
            state => {
                tracing::debug!(?state, ?branch, "Enumeration reply ignored");
                EnumerationStep::Ignored
            }
        }
    }

    /// Record the candidate list handed to the picker.
    pub fn offer_candidates(&mut self, candidates: CandidateList) {
        self.candidates = candidates;
        self.transition(SessionState::WaitingForSelection);
    }

    /// A selection is about to be dispatched; only one may be outstanding.
    pub fn begin_dispatch(&mut self) -> Result<(), SelectionRejected> {
        match self.state {
            SessionState::WaitingForSelection => {
                self.transition(SessionState::RequestSentToBackend);
                Ok(())
            }
            state => {
                tracing::error!(?state, "Selection rejected while not waiting for one");
                Err(SelectionRejected(state))
            }
        }
    }

    pub fn on_backend_reply(&mut self, succeeded: bool) -> ReplyStep {
        match self.state {
            SessionState::RequestSentToBackend => {
                if succeeded || !self.is_conditional {
                    self.transition(SessionState::Idle);
                    ReplyStep::Deliver
                } else {
                    tracing::debug!("Selection failed; waiting for another selection");
                    self.transition(SessionState::WaitingForSelection);
                    ReplyStep::AwaitSelection
                }
            }
            SessionState::CancelPending if self.cancel_requested_in_flight => {
                self.transition(SessionState::Idle);
                if succeeded {
                    ReplyStep::Deliver
                } else {
                    ReplyStep::Abort
                }
            }
            SessionState::Idle => {
                tracing::error!(
                    succeeded,
                    "Contract violation: backend reply received while idle"
                );
                ReplyStep::Ignored
            }
            state => {
                tracing::error!(?state, succeeded, "Backend reply received without a dispatch");
                ReplyStep::Ignored
            }
        }
    }

    pub fn cancel(&mut self) -> CancelStep {
        match self.state {
            SessionState::WaitingForRpValidation => {
                self.transition(SessionState::CancelPendingValidationComplete);
                CancelStep::Deferred
            }
            SessionState::WaitingForCredentialList => {
                self.cancel_requested_in_flight = false;
                // The session reports the abort once the outstanding
                // enumeration replies; the barrier only drops its slots.
                let cancelled = self.barrier.cancel().is_some();
                tracing::debug!(cancelled, "Cancel pending on the credential list");
                self.transition(SessionState::CancelPending);
                CancelStep::Deferred
            }
            SessionState::WaitingForSelection => {
                self.transition(SessionState::Idle);
                CancelStep::AbortNow {
                    cleanup_picker: true,
                }
            }
            SessionState::RequestSentToBackend => {
                self.cancel_requested_in_flight = true;
                self.transition(SessionState::CancelPending);
                CancelStep::Deferred
            }
            state => {
                tracing::debug!(?state, "Cancel ignored");
                CancelStep::Ignored
            }
        }
    }
}
