use std::sync::Arc;
use std::time::Duration;

use passkey_dispatch::{
    AuthStatus, BackendKind, CreateReply, CreateRequest, CredentialDescriptor, CredentialId,
    CredentialResponse, CredentialSummary, GetReply, GetRequest, Mediation, OrchestratorConfig,
    RequestCommon, RequestHandle, RequestOrchestrator, ResidentKey, SupportLevel, UserEntity,
};

use super::scripted::Script;

pub const RP_ID: &str = "example.com";
pub const ORIGIN: &str = "https://example.com";

pub fn orchestrator(script: &Arc<Script>, support_level: SupportLevel) -> RequestOrchestrator {
    orchestrator_with(
        script,
        OrchestratorConfig::default().with_support_level(support_level),
    )
}

pub fn orchestrator_with(script: &Arc<Script>, config: OrchestratorConfig) -> RequestOrchestrator {
    RequestOrchestrator::new(script.collaborators(), config)
}

pub fn cred_id(id: u8) -> CredentialId {
    CredentialId::new(vec![id])
}

pub fn get_request(mediation: Mediation, allow: &[u8]) -> GetRequest {
    GetRequest {
        common: RequestCommon::new(RP_ID, ORIGIN, vec![0xc4; 32]),
        allow_credentials: allow
            .iter()
            .map(|id| CredentialDescriptor::new(vec![*id]))
            .collect(),
        mediation,
        app_id: None,
    }
}

pub fn create_request(resident_key: ResidentKey) -> CreateRequest {
    CreateRequest {
        common: RequestCommon::new(RP_ID, ORIGIN, vec![0xc5; 32]),
        user: UserEntity {
            id: vec![0x01, 0x02],
            name: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
        },
        exclude_credentials: Vec::new(),
        algorithms: vec![-7, -257],
        resident_key,
        echo_cred_props: false,
        is_conditional: false,
    }
}

pub fn summary(id: u8, is_discoverable: bool, source: BackendKind) -> CredentialSummary {
    CredentialSummary {
        credential_id: cred_id(id),
        user_id: vec![id],
        user_name: format!("user{id}@example.com"),
        user_display_name: format!("User {id}"),
        is_discoverable,
        is_payment: false,
        source,
    }
}

pub fn legacy(id: u8) -> CredentialSummary {
    summary(id, true, BackendKind::LegacyPlatformApi)
}

pub fn unified(id: u8) -> CredentialSummary {
    summary(id, true, BackendKind::UnifiedCredentialBroker)
}

pub fn get_reply(id: u8) -> GetReply {
    GetReply {
        credential_id: cred_id(id),
        authenticator_data: vec![0xaa; 37],
        signature: vec![0x30, 0x45],
        user_handle: Some(vec![id]),
        client_data_json: None,
        echo_app_id: false,
    }
}

pub fn create_reply(id: u8) -> CreateReply {
    CreateReply {
        credential_id: cred_id(id),
        attestation_object: vec![0xa3],
        client_data_json: None,
        transports: Vec::new(),
        has_resident_key: Some(true),
        echo_cred_props: false,
    }
}

/// The request's terminal result, failing the test if it never arrives.
pub async fn finish(handle: RequestHandle) -> Result<CredentialResponse, AuthStatus> {
    tokio::time::timeout(Duration::from_secs(2), handle.response())
        .await
        .expect("timed out waiting for the terminal result")
}

/// The credential id of an assertion result.
pub fn asserted_id(result: &Result<CredentialResponse, AuthStatus>) -> Option<CredentialId> {
    match result {
        Ok(CredentialResponse::Asserted(reply)) => Some(reply.credential_id.clone()),
        _ => None,
    }
}
