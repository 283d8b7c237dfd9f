use super::events::{BackendCall, EnumerationPurpose};
use super::task::RequestTask;
use crate::barrier::{BarrierMode, Branch};
use crate::conditional::{ConditionalSession, EnumerationStep, SessionState};
use crate::dispatch::{self, BackendKind, DispatchMode};
use crate::request::{CredentialId, CredentialRequest, CredentialSummary, GetRequest};
use crate::status::{AuthStatus, BackendFailure, OperationKind, Outcome, translate_failure};

impl RequestTask {
    fn get_request(&self) -> Option<&GetRequest> {
        match &self.request {
            CredentialRequest::Get(req) => Some(req),
            CredentialRequest::Create(_) => None,
        }
    }

    pub(super) fn dispatch_get(&mut self) {
        let mode = dispatch::decide(&self.dispatch_input());
        self.run_get_mode(mode);
    }

    fn run_get_mode(&mut self, mode: DispatchMode) {
        let Some(request) = self.get_request().cloned() else {
            return;
        };
        let has_session = self.session.is_some();

        match mode {
            DispatchMode::Reject { status, outcome } => self.fail(status, Some(outcome)),
            DispatchMode::Joined(barrier_mode) => self.begin_enumeration(barrier_mode, request),
            DispatchMode::OnlyLegacy if has_session => {
                self.begin_enumeration(BarrierMode::OnlyBranchA, request)
            }
            DispatchMode::OnlyUnified if has_session => {
                self.begin_enumeration(BarrierMode::OnlyBranchB, request)
            }
            DispatchMode::OnlyLegacy => self.issue(BackendCall::Get {
                backend: BackendKind::LegacyPlatformApi,
                request,
            }),
            DispatchMode::OnlyUnified => self.issue(BackendCall::Get {
                backend: BackendKind::UnifiedCredentialBroker,
                request,
            }),
            DispatchMode::Sequential { primary, fallback } => {
                self.fallback = Some(fallback);
                self.issue(BackendCall::Get {
                    backend: primary,
                    request,
                });
            }
            DispatchMode::MatchingCheck if !self.config.legacy_available => {
                tracing::debug!("Legacy platform API unavailable; matching check finds nothing");
                let mode = dispatch::resolve_matching_check(
                    Ok(&[][..]),
                    &request.allow_credentials,
                    self.config.support_level,
                );
                self.run_get_mode(mode);
            }
            DispatchMode::MatchingCheck => self.issue(BackendCall::Enumerate {
                rp_id: request.common.rp_id,
                purpose: EnumerationPurpose::MatchingCheck,
            }),
            DispatchMode::OnlyIdentity => {
                tracing::error!(?mode, "Dispatch mode not applicable to get");
                self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
            }
        }
    }

    /// Arm the session's barrier and query the branches `mode` arms.
    fn begin_enumeration(&mut self, mode: BarrierMode, request: GetRequest) {
        self.session
            .get_or_insert_with(|| ConditionalSession::new(false))
            .begin_enumeration(mode);

        let (legacy, unified) = match mode {
            BarrierMode::RequireBoth | BarrierMode::RaceEitherSucceeds => (true, true),
            BarrierMode::OnlyBranchA => (true, false),
            BarrierMode::OnlyBranchB => (false, true),
        };
        if legacy {
            self.issue(BackendCall::Enumerate {
                rp_id: request.common.rp_id.clone(),
                purpose: EnumerationPurpose::CandidateList,
            });
        }
        if unified {
            self.issue(BackendCall::Prefetch(request));
        }
    }

    pub(super) fn on_candidates(
        &mut self,
        branch: Branch,
        result: Result<Vec<CredentialSummary>, BackendFailure>,
    ) {
        let result = result.map_err(|failure| {
            tracing::error!(?branch, %failure, "Credential enumeration failed");
            translate_failure(&failure, OperationKind::Get).0
        });
        let Some(session) = self.session.as_mut() else {
            tracing::warn!(?branch, "Candidate list without a picker session");
            return;
        };

        match session.on_enumeration(branch, result) {
            EnumerationStep::Pending | EnumerationStep::Ignored => {}
            EnumerationStep::Ready { legacy, unified } => self.show_candidates(legacy, unified),
            EnumerationStep::Failed(status) => self.fail(status, Some(Outcome::OtherFailure)),
            EnumerationStep::Abort => self.fail(AuthStatus::AbortedByCaller, None),
        }
    }

    fn show_candidates(&mut self, legacy: Vec<CredentialSummary>, unified: Vec<CredentialSummary>) {
        let Some(request) = self.get_request() else {
            return;
        };
        let candidates = merge_candidates(request, legacy, unified);
        let offer_hybrid = self.config.hybrid_supported && self.config.legacy_available;
        let Some(selection) = self.selection_sender() else {
            tracing::error!("Event channel closed; cannot show the picker");
            self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
            return;
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let is_conditional = session.is_conditional();
        tracing::debug!(
            count = candidates.len(),
            is_conditional,
            offer_hybrid,
            "Showing candidates"
        );
        session.offer_candidates(candidates.clone());
        self.collaborators
            .picker
            .show_candidates(candidates, is_conditional, selection, offer_hybrid);
    }

    pub(super) fn on_matching_check(
        &mut self,
        result: Result<Vec<CredentialSummary>, BackendFailure>,
    ) {
        let Some(request) = self.get_request() else {
            return;
        };
        let enumerated = result
            .as_deref()
            .map_err(|failure| translate_failure(failure, OperationKind::Get).0);
        let mode = dispatch::resolve_matching_check(
            enumerated,
            &request.allow_credentials,
            self.config.support_level,
        );
        self.run_get_mode(mode);
    }

    pub(super) fn on_selected(&mut self, credential_id: CredentialId) {
        let Some(request) = self.get_request().cloned() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            tracing::warn!(%credential_id, "Selection without a picker session");
            return;
        };
        let Some(backend) = session.candidate(&credential_id).map(|c| c.source) else {
            tracing::error!(%credential_id, "Selected credential was never offered");
            return;
        };
        if session.begin_dispatch().is_err() {
            return;
        }

        tracing::debug!(%credential_id, %backend, "Dispatching selected credential");
        let mut request = request;
        request.restrict_to(credential_id);
        self.issue(BackendCall::Get { backend, request });
    }

    pub(super) fn on_hybrid(&mut self) {
        if !self.config.hybrid_supported {
            tracing::error!("Hybrid selected but it was never offered");
            return;
        }
        let Some(request) = self.get_request().cloned() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("Hybrid selection without a picker session");
            return;
        };
        if session.begin_dispatch().is_err() {
            return;
        }
        self.issue(BackendCall::HybridGet(request));
    }

    pub(super) fn on_dismissed(&mut self) {
        let Some(session) = self.session.as_ref() else {
            tracing::warn!("Picker dismissed without a picker session");
            return;
        };
        if session.state() != SessionState::WaitingForSelection {
            tracing::debug!(state = ?session.state(), "Picker dismissal ignored");
            return;
        }

        if session.is_conditional() {
            // The embedder cannot run conditional UI
            tracing::error!("Conditional picker dismissed");
            self.collaborators.picker.cleanup();
            self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
        } else {
            self.fail(AuthStatus::NotAllowed, Some(Outcome::UserCancellation));
        }
    }

    pub(super) fn issue_fallback(&mut self, backend: BackendKind) {
        let Some(request) = self.get_request().cloned() else {
            tracing::error!(%backend, "Fallback registered for a create request");
            self.fail(AuthStatus::NotAllowed, Some(Outcome::OtherFailure));
            return;
        };
        self.issue(BackendCall::Get { backend, request });
    }
}

/// Candidates for the picker: discoverable legacy credentials first, then the
/// broker's, both narrowed to the allow list when there is one.
pub(super) fn merge_candidates(
    request: &GetRequest,
    legacy: Vec<CredentialSummary>,
    unified: Vec<CredentialSummary>,
) -> Vec<CredentialSummary> {
    let allowed = |c: &CredentialSummary| {
        !request.has_allow_credentials() || request.is_allowed(&c.credential_id)
    };

    let mut merged: Vec<CredentialSummary> = legacy
        .into_iter()
        .filter(|c| c.is_discoverable && allowed(c))
        .collect();

    for candidate in unified.into_iter().filter(|c| allowed(c)) {
        if !merged
            .iter()
            .any(|m| m.credential_id == candidate.credential_id)
        {
            merged.push(candidate);
        }
    }
    merged
}
