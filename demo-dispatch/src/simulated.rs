use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use passkey_dispatch::{
    AuthStatus, BackendFailure, BackendKind, Collaborators, CreateReply, CreateRequest,
    CredentialId, CredentialSummary, GetCredentialReply, GetReply, GetRequest, IdentityBroker,
    LegacyPlatformApi, Outcome, OutcomeRecorder, PickerBridge, ResidentKey, SecurityCheckParams,
    SecurityCheckResult, SecurityChecker, SelectionSender, Transport, UnifiedCredentialBroker,
    codes,
};

const LATENCY: Duration = Duration::from_millis(50);

fn summary(id: u8, user: &str, is_discoverable: bool, source: BackendKind) -> CredentialSummary {
    CredentialSummary {
        credential_id: CredentialId::new(vec![id; 16]),
        user_id: vec![id],
        user_name: format!("{user}@example.com"),
        user_display_name: user.to_string(),
        is_discoverable,
        is_payment: false,
        source,
    }
}

fn assertion(credential_id: CredentialId) -> GetReply {
    GetReply {
        credential_id,
        authenticator_data: vec![0x49; 37],
        signature: vec![0x30, 0x44],
        user_handle: None,
        client_data_json: None,
        echo_app_id: false,
    }
}

fn attestation(request: &CreateRequest, id: u8) -> CreateReply {
    CreateReply {
        credential_id: CredentialId::new(vec![id; 16]),
        attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74],
        client_data_json: None,
        transports: vec![Transport::Internal],
        has_resident_key: Some(request.resident_key != ResidentKey::Discouraged),
        echo_cred_props: false,
    }
}

/// Accepts any origin that is the relying party ID over https.
struct Security;

impl Security {
    fn check(params: &SecurityCheckParams) -> SecurityCheckResult {
        let origin = params.override_origin.as_deref().unwrap_or(&params.origin);
        match origin.strip_prefix("https://") {
            Some(host) if host == params.rp_id || host.ends_with(&format!(".{}", params.rp_id)) => {
                SecurityCheckResult::ok(false)
            }
            _ => SecurityCheckResult::failed(AuthStatus::InvalidDomain),
        }
    }
}

#[async_trait]
impl SecurityChecker for Security {
    async fn check_create(&self, params: SecurityCheckParams) -> SecurityCheckResult {
        tokio::time::sleep(LATENCY).await;
        Self::check(&params)
    }

    async fn check_get(&self, params: SecurityCheckParams) -> SecurityCheckResult {
        tokio::time::sleep(LATENCY).await;
        Self::check(&params)
    }
}

/// A platform authenticator holding one discoverable and one server-side
/// credential.
struct Legacy {
    credentials: Vec<CredentialSummary>,
}

#[async_trait]
impl LegacyPlatformApi for Legacy {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure> {
        tokio::time::sleep(LATENCY).await;
        let excluded = request
            .exclude_credentials
            .iter()
            .any(|d| self.credentials.iter().any(|c| c.credential_id == d.id));
        if excluded {
            return Err(BackendFailure::native(
                codes::INVALID_STATE_ERR,
                "One of the excluded credentials exists on the local device",
            ));
        }
        Ok(attestation(&request, 0x10))
    }

    async fn get_assertion(&self, request: GetRequest) -> Result<GetReply, BackendFailure> {
        tokio::time::sleep(LATENCY).await;
        self.credentials
            .iter()
            .find(|c| {
                request.is_allowed(&c.credential_id)
                    || (!request.has_allow_credentials() && c.is_discoverable)
            })
            .map(|c| assertion(c.credential_id.clone()))
            .ok_or(BackendFailure::NoCredentials)
    }

    async fn hybrid_get_assertion(&self, _request: GetRequest) -> Result<GetReply, BackendFailure> {
        tokio::time::sleep(LATENCY * 4).await;
        Ok(assertion(CredentialId::new(vec![0x77; 16])))
    }

    async fn enumerate_credentials(
        &self,
        _rp_id: &str,
    ) -> Result<Vec<CredentialSummary>, BackendFailure> {
        tokio::time::sleep(LATENCY).await;
        Ok(self.credentials.clone())
    }

    async fn is_platform_authenticator_available(&self) -> Result<bool, BackendFailure> {
        Ok(true)
    }
}

struct Unified {
    credentials: Vec<CredentialSummary>,
}

#[async_trait]
impl UnifiedCredentialBroker for Unified {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure> {
        tokio::time::sleep(LATENCY * 2).await;
        Ok(attestation(&request, 0x20))
    }

    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<GetCredentialReply, BackendFailure> {
        tokio::time::sleep(LATENCY * 2).await;
        self.credentials
            .iter()
            .find(|c| !request.has_allow_credentials() || request.is_allowed(&c.credential_id))
            .map(|c| GetCredentialReply::Assertion(assertion(c.credential_id.clone())))
            .ok_or(BackendFailure::NoCredentials)
    }

    async fn prefetch_candidates(
        &self,
        _request: GetRequest,
    ) -> Result<Vec<CredentialSummary>, BackendFailure> {
        tokio::time::sleep(LATENCY * 2).await;
        Ok(self.credentials.clone())
    }
}

struct Identity;

#[async_trait]
impl IdentityBroker for Identity {
    async fn create_credential(
        &self,
        request: CreateRequest,
    ) -> Result<CreateReply, BackendFailure> {
        tokio::time::sleep(LATENCY).await;
        Ok(attestation(&request, 0x30))
    }
}

/// Picks the last offered candidate after a short pause.
struct AutoPicker;

impl PickerBridge for AutoPicker {
    fn show_candidates(
        &self,
        candidates: Vec<CredentialSummary>,
        is_conditional: bool,
        selection: SelectionSender,
        _offer_hybrid: bool,
    ) {
        for c in &candidates {
            tracing::info!(
                credential_id = %c.credential_id,
                user = %c.user_name,
                source = %c.source,
                is_conditional,
                "Picker entry"
            );
        }
        tokio::spawn(async move {
            tokio::time::sleep(LATENCY).await;
            match candidates.last() {
                Some(c) => selection.select(c.credential_id.clone()),
                None => selection.dismiss(),
            }
        });
    }

    fn cleanup(&self) {
        tracing::info!("Picker closed");
    }
}

pub struct LogRecorder;

impl OutcomeRecorder for LogRecorder {
    fn record(&self, outcome: Outcome) {
        tracing::info!(?outcome, code = outcome.code(), "Recorded failure outcome");
    }
}

pub fn collaborators() -> Collaborators {
    Collaborators {
        security: Arc::new(Security),
        legacy: Arc::new(Legacy {
            credentials: vec![
                summary(1, "alice", true, BackendKind::LegacyPlatformApi),
                summary(2, "alice-u2f", false, BackendKind::LegacyPlatformApi),
            ],
        }),
        unified: Arc::new(Unified {
            credentials: vec![summary(3, "bob", true, BackendKind::UnifiedCredentialBroker)],
        }),
        identity: Arc::new(Identity),
        picker: Arc::new(AutoPicker),
    }
}
