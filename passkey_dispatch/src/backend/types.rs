use async_trait::async_trait;
use std::sync::Arc;

use crate::orchestrator::SelectionSender;
use crate::request::{
    CreateReply, CreateRequest, CredentialSummary, GetCredentialReply, GetReply, GetRequest,
};
use crate::status::{AuthStatus, BackendFailure, Outcome};

/// Input to the relying-party validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityCheckParams {
    pub rp_id: String,
    pub origin: String,
    pub is_payment: bool,
    /// Origin supplied by a remote desktop client, validated instead of `origin`.
    pub override_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityCheckResult {
    pub status: Result<(), AuthStatus>,
    pub is_cross_origin: bool,
}

impl SecurityCheckResult {
    pub fn ok(is_cross_origin: bool) -> Self {
        Self {
            status: Ok(()),
            is_cross_origin,
        }
    }

    pub fn failed(status: AuthStatus) -> Self {
        Self {
            status: Err(status),
            is_cross_origin: false,
        }
    }
}

/// Validates the relying party ID against the caller's origin.
#[async_trait]
pub trait SecurityChecker: Send + Sync + 'static {
    async fn check_create(&self, params: SecurityCheckParams) -> SecurityCheckResult;

    async fn check_get(&self, params: SecurityCheckParams) -> SecurityCheckResult;
}

/// The on-device platform authenticator API.
#[async_trait]
pub trait LegacyPlatformApi: Send + Sync + 'static {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure>;

    async fn get_assertion(&self, request: GetRequest) -> Result<GetReply, BackendFailure>;

    /// Assertion through a phone or another nearby device.
    async fn hybrid_get_assertion(&self, request: GetRequest) -> Result<GetReply, BackendFailure>;

    /// Credentials stored locally for `rp_id`.
    async fn enumerate_credentials(
        &self,
        rp_id: &str,
    ) -> Result<Vec<CredentialSummary>, BackendFailure>;

    async fn is_platform_authenticator_available(&self) -> Result<bool, BackendFailure>;
}

/// The system-wide credential broker that aggregates credential providers.
#[async_trait]
pub trait UnifiedCredentialBroker: Send + Sync + 'static {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure>;

    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<GetCredentialReply, BackendFailure>;

    /// Candidates the broker would offer for `request`, for display in the picker.
    async fn prefetch_candidates(
        &self,
        request: GetRequest,
    ) -> Result<Vec<CredentialSummary>, BackendFailure>;
}

/// Serves conditional create.
#[async_trait]
pub trait IdentityBroker: Send + Sync + 'static {
    async fn create_credential(&self, request: CreateRequest)
    -> Result<CreateReply, BackendFailure>;
}

/// Account-selection UI. Calls return immediately; the user's answer comes
/// back through the [`SelectionSender`].
pub trait PickerBridge: Send + Sync + 'static {
    fn show_candidates(
        &self,
        candidates: Vec<CredentialSummary>,
        is_conditional: bool,
        selection: SelectionSender,
        offer_hybrid: bool,
    );

    fn cleanup(&self);
}

/// Fire-and-forget failure metrics.
pub trait OutcomeRecorder: Send + Sync + 'static {
    fn record(&self, outcome: Outcome);
}

/// The collaborators one orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub security: Arc<dyn SecurityChecker>,
    pub legacy: Arc<dyn LegacyPlatformApi>,
    pub unified: Arc<dyn UnifiedCredentialBroker>,
    pub identity: Arc<dyn IdentityBroker>,
    pub picker: Arc<dyn PickerBridge>,
}
