//! Top-level request handling.
//!
//! A [`RequestOrchestrator`] owns at most one request at a time. Each
//! accepted request runs in its own task that consumes collaborator replies,
//! picker events and cancellations as events, and delivers exactly one
//! terminal result through the returned [`RequestHandle`].

mod create;
mod errors;
mod events;
mod get;
mod handle;
mod task;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};

use crate::backend::{Collaborators, OutcomeRecorder};
use crate::config::OrchestratorConfig;
use crate::dispatch::SupportLevel;
use crate::request::{CreateRequest, CredentialId, CredentialRequest, GetRequest};
use crate::status::AuthStatus;

pub use errors::OrchestratorError;
pub use handle::{Canceller, PickerEvent, RequestHandle, RequestId, SelectionSender};

use task::RequestTask;

pub struct RequestOrchestrator {
    collaborators: Collaborators,
    config: OrchestratorConfig,
    in_flight: Arc<AtomicBool>,
}

impl RequestOrchestrator {
    pub fn new(collaborators: Collaborators, config: OrchestratorConfig) -> Self {
        Self {
            collaborators,
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// True while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a credential creation. Must be called within a tokio runtime.
    pub fn handle_create(
        &self,
        request: CreateRequest,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<RequestHandle, OrchestratorError> {
        self.start(CredentialRequest::Create(request), recorder)
    }

    /// Start a credential assertion. Must be called within a tokio runtime.
    pub fn handle_get(
        &self,
        request: GetRequest,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<RequestHandle, OrchestratorError> {
        self.start(CredentialRequest::Get(request), recorder)
    }

    fn start(
        &self,
        request: CredentialRequest,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<RequestHandle, OrchestratorError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| OrchestratorError::NoRuntime(e.to_string()).log())?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OrchestratorError::RequestInFlight.log());
        }

        let id = RequestId::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (responder, response) = oneshot::channel();

        let task = RequestTask::new(
            id,
            request,
            self.collaborators.clone(),
            self.config,
            recorder,
            events_tx.downgrade(),
            responder,
            self.in_flight.clone(),
        );
        runtime.spawn(task.run(events_rx));

        Ok(RequestHandle::new(id, events_tx, response))
    }

    /// Whether a user-verifying platform authenticator can be used.
    pub async fn is_platform_authenticator_available(&self) -> bool {
        if self.config.support_level == SupportLevel::UnifiedPreferredUnlessInapplicable {
            return true;
        }
        if !self.config.legacy_available {
            return false;
        }
        match self
            .collaborators
            .legacy
            .is_platform_authenticator_available()
            .await
        {
            Ok(available) => available,
            Err(e) => {
                tracing::error!("Platform authenticator query failed: {}", e);
                false
            }
        }
    }

    /// The ids in `allow_ids` stored on the legacy backend for `rp_id`.
    pub async fn get_matching_credential_ids(
        &self,
        rp_id: &str,
        allow_ids: &[CredentialId],
        require_third_party_payment: bool,
    ) -> Result<Vec<CredentialId>, AuthStatus> {
        if !self.config.legacy_available {
            tracing::error!("Legacy platform API is not available");
            return Err(AuthStatus::UnknownError);
        }

        let credentials = self
            .collaborators
            .legacy
            .enumerate_credentials(rp_id)
            .await
            .map_err(|e| {
                tracing::error!("Credential enumeration failed: {}", e);
                AuthStatus::NotAllowed
            })?;

        Ok(credentials
            .into_iter()
            .filter(|c| !require_third_party_payment || c.is_payment)
            .filter(|c| allow_ids.contains(&c.credential_id))
            .map(|c| c.credential_id)
            .collect())
    }
}
