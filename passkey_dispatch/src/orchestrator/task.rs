use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use super::events::{BackendCall, EnumerationPurpose, Event};
use super::handle::{PickerEvent, RequestId, SelectionSender};
use crate::backend::{Collaborators, OutcomeRecorder, SecurityCheckParams, SecurityCheckResult};
use crate::barrier::Branch;
use crate::conditional::{CancelStep, ConditionalSession, ReplyStep, ValidationStep};
use crate::config::OrchestratorConfig;
use crate::dispatch::{BackendKind, DispatchInput};
use crate::request::{CredentialRequest, CredentialResponse, Mediation};
use crate::status::{AuthStatus, BackendFailure, OperationKind, Outcome, translate_failure};

pub(super) type Responder = oneshot::Sender<Result<CredentialResponse, AuthStatus>>;

/// Per-request event loop. Owns the request, its picker session and the
/// responder; every collaborator reply comes back as an [`Event`].
pub(super) struct RequestTask {
    pub(super) id: RequestId,
    pub(super) request: CredentialRequest,
    pub(super) collaborators: Collaborators,
    pub(super) config: OrchestratorConfig,
    recorder: Arc<dyn OutcomeRecorder>,
    /// Weak so the loop sees the channel close once the caller, the picker
    /// and every outstanding call have gone.
    events: mpsc::WeakUnboundedSender<Event>,
    pub(super) session: Option<ConditionalSession>,
    /// Backend to try once if the first one has no usable credential.
    pub(super) fallback: Option<BackendKind>,
    responder: Option<Responder>,
    in_flight: Arc<AtomicBool>,
}

impl RequestTask {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        id: RequestId,
        request: CredentialRequest,
        collaborators: Collaborators,
        config: OrchestratorConfig,
        recorder: Arc<dyn OutcomeRecorder>,
        events: mpsc::WeakUnboundedSender<Event>,
        responder: Responder,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            request,
            collaborators,
            config,
            recorder,
            events,
            session: None,
            fallback: None,
            responder: Some(responder),
            in_flight,
        }
    }

    pub(super) async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        let span = tracing::info_span!(
            "credential_request",
            id = %self.id,
            op = ?self.request.operation()
        );

        async move {
            tracing::debug!(rp_id = %self.request.common().rp_id, "Request started");
            self.start();
            while !self.is_finished() {
                let Some(event) = events.recv().await else {
                    break;
                };
                self.handle(event);
            }
            if !self.is_finished() {
                tracing::error!("Event channel closed before a terminal result");
                self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
            }
        }
        .instrument(span)
        .await
    }

    pub(super) fn is_finished(&self) -> bool {
        self.responder.is_none()
    }

    fn start(&mut self) {
        if let CredentialRequest::Get(req) = &self.request {
            if req.common.challenge.is_empty() {
                tracing::error!("Get request without a challenge");
                self.fail(
                    AuthStatus::UnsupportedOperation,
                    Some(Outcome::OtherFailure),
                );
                return;
            }
            if req.mediation == Mediation::Conditional {
                self.session = Some(ConditionalSession::awaiting_validation(true));
            }
        }

        let common = self.request.common();
        let params = SecurityCheckParams {
            rp_id: common.rp_id.clone(),
            origin: common.origin.clone(),
            is_payment: common.is_payment(),
            override_origin: common
                .remote_desktop_override
                .as_ref()
                .map(|o| o.origin.clone()),
        };
        self.issue(BackendCall::SecurityCheck {
            op: self.request.operation(),
            params,
        });
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::SecurityChecked(result) => self.on_security_checked(result),
            Event::Enumerated {
                purpose: EnumerationPurpose::CandidateList,
                result,
            } => self.on_candidates(Branch::A, result),
            Event::Enumerated {
                purpose: EnumerationPurpose::MatchingCheck,
                result,
            } => self.on_matching_check(result),
            Event::Prefetched(result) => self.on_candidates(Branch::B, result),
            Event::Replied { backend, result } => self.on_reply(backend, result),
            Event::Picker(PickerEvent::Selected(id)) => self.on_selected(id),
            Event::Picker(PickerEvent::Hybrid) => self.on_hybrid(),
            Event::Picker(PickerEvent::Dismissed) => self.on_dismissed(),
            Event::Cancel => self.on_cancel(),
        }
    }

    fn on_security_checked(&mut self, result: SecurityCheckResult) {
        let validation = self
            .session
            .as_mut()
            .map(ConditionalSession::on_validation_complete);

        if validation == Some(ValidationStep::Abort) {
            tracing::debug!("Request cancelled while validating the relying party");
            self.fail(AuthStatus::AbortedByCaller, None);
            return;
        }

        if let Err(status) = result.status {
            tracing::error!(?status, "Security check failed");
            self.fail(status, Some(Outcome::SecurityError));
            return;
        }

        let common = self.request.common_mut();
        common.is_cross_origin = match &common.remote_desktop_override {
            Some(o) => !o.same_origin_with_ancestors,
            None => result.is_cross_origin,
        };

        match self.request.operation() {
            OperationKind::Create => self.dispatch_create(),
            OperationKind::Get => self.dispatch_get(),
        }
    }

    fn on_reply(
        &mut self,
        backend: BackendKind,
        result: Result<CredentialResponse, BackendFailure>,
    ) {
        if let Some(session) = self.session.as_mut() {
            let is_conditional = session.is_conditional();
            match session.on_backend_reply(result.is_ok()) {
                ReplyStep::Deliver => {
                    if is_conditional {
                        self.collaborators.picker.cleanup();
                    }
                }
                ReplyStep::Ignored => return,
                ReplyStep::AwaitSelection => {
                    if let Err(failure) = &result {
                        tracing::error!(
                            %backend,
                            %failure,
                            "Selected credential failed; awaiting another selection"
                        );
                    }
                    return;
                }
                ReplyStep::Abort => {
                    if is_conditional {
                        self.collaborators.picker.cleanup();
                    }
                    self.fail(AuthStatus::AbortedByCaller, None);
                    return;
                }
            }
        }

        match result {
            Ok(response) => {
                tracing::debug!(%backend, "Backend call succeeded");
                let response = self.decorate(response);
                self.finish(Ok(response), None);
            }
            Err(BackendFailure::NoCredentials) if self.fallback.is_some() => {
                if let Some(fallback) = self.fallback.take() {
                    tracing::debug!(%backend, %fallback, "No usable credential; falling back");
                    self.issue_fallback(fallback);
                }
            }
            Err(failure) => {
                let (status, outcome) = translate_failure(&failure, self.request.operation());
                tracing::error!(%backend, %failure, ?status, "Backend call failed");
                self.fail(status, Some(outcome));
            }
        }
    }

    fn on_cancel(&mut self) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Cancel ignored: no picker session");
            return;
        };
        match session.cancel() {
            CancelStep::Deferred | CancelStep::Ignored => {}
            CancelStep::AbortNow { cleanup_picker } => {
                if cleanup_picker {
                    self.collaborators.picker.cleanup();
                }
                self.fail(AuthStatus::AbortedByCaller, None);
            }
        }
    }

    /// Echo the extensions the request asked for.
    fn decorate(&self, response: CredentialResponse) -> CredentialResponse {
        match (response, &self.request) {
            (CredentialResponse::Created(mut reply), CredentialRequest::Create(req)) => {
                reply.echo_cred_props = req.echo_cred_props;
                CredentialResponse::Created(reply)
            }
            (CredentialResponse::Asserted(mut reply), CredentialRequest::Get(req)) => {
                reply.echo_app_id = req.app_id.is_some();
                CredentialResponse::Asserted(reply)
            }
            (response, _) => response,
        }
    }

    pub(super) fn dispatch_input(&self) -> DispatchInput {
        let common = self.request.common();
        match &self.request {
            CredentialRequest::Create(req) => DispatchInput {
                operation: self.request.operation(),
                mediation: Mediation::None,
                has_allow_or_exclude_list: !req.exclude_credentials.is_empty(),
                is_payment: common.is_payment(),
                resident_key: Some(req.resident_key),
                conditional_create: req.is_conditional,
                support: self.config.support_level,
            },
            CredentialRequest::Get(req) => DispatchInput {
                operation: self.request.operation(),
                mediation: req.mediation,
                has_allow_or_exclude_list: req.has_allow_credentials(),
                is_payment: common.is_payment(),
                resident_key: None,
                conditional_create: false,
                support: self.config.support_level,
            },
        }
    }

    pub(super) fn selection_sender(&self) -> Option<SelectionSender> {
        self.events
            .upgrade()
            .map(|events| SelectionSender::new(self.id, events))
    }

    /// Spawn `call`; its reply comes back through the event channel.
    pub(super) fn issue(&mut self, call: BackendCall) {
        if self.is_finished() {
            return;
        }
        if call.backend() == Some(BackendKind::LegacyPlatformApi) && !self.config.legacy_available
        {
            tracing::error!(call = call.name(), "Legacy platform API is not available");
            self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
            return;
        }

        let Some(events) = self.events.upgrade() else {
            tracing::error!(call = call.name(), "Event channel closed; cannot issue call");
            self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
            return;
        };

        tracing::debug!(call = call.name(), backend = ?call.backend(), "Issuing call");
        let name = call.name();
        let slot = call.reply_slot();
        let collaborators = self.collaborators.clone();
        let running =
            tokio::spawn(async move { call.execute(&collaborators).await }.in_current_span());
        tokio::spawn(
            async move {
                let event = match running.await {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(
                            call = name,
                            error = %e,
                            "Collaborator call did not complete"
                        );
                        slot.failed(BackendFailure::Unavailable(e.to_string()))
                    }
                };
                if events.send(event).is_err() {
                    tracing::warn!(call = name, "Request already finished; dropping late reply");
                }
            }
            .in_current_span(),
        );
    }

    pub(super) fn fail(&mut self, status: AuthStatus, outcome: Option<Outcome>) {
        self.finish(Err(status), outcome);
    }

    /// Deliver the terminal result. Anything after the first call is dropped.
    fn finish(&mut self, result: Result<CredentialResponse, AuthStatus>, outcome: Option<Outcome>) {
        let Some(responder) = self.responder.take() else {
            tracing::error!("Terminal result already delivered; dropping another one");
            return;
        };

        match &result {
            Ok(_) => tracing::info!("Request succeeded"),
            Err(status) => {
                tracing::info!(?status, ?outcome, "Request failed");
                if let Some(outcome) = outcome {
                    self.recorder.record(outcome);
                }
            }
        }

        self.session = None;
        self.fallback = None;
        self.in_flight.store(false, Ordering::Release);

        if responder.send(result).is_err() {
            tracing::debug!("Caller dropped the request handle before the result");
        }
    }
}
