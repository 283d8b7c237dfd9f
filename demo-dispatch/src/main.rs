use dotenvy::dotenv;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passkey_dispatch::{
    AuthStatus, CreateRequest, CredentialDescriptor, CredentialId, CredentialResponse,
    GetRequest, Mediation, OrchestratorConfig, RequestCommon, RequestOrchestrator, ResidentKey,
    UserEntity,
};

mod simulated;

use crate::simulated::{LogRecorder, collaborators};

const RP_ID: &str = "example.com";
const ORIGIN: &str = "https://login.example.com";

fn get_request(mediation: Mediation, allow: &[CredentialId]) -> GetRequest {
    GetRequest {
        common: RequestCommon::new(RP_ID, ORIGIN, b"demo-get-challenge".to_vec()),
        allow_credentials: allow.iter().cloned().map(CredentialDescriptor::new).collect(),
        mediation,
        app_id: None,
    }
}

fn create_request(resident_key: ResidentKey, is_conditional: bool) -> CreateRequest {
    CreateRequest {
        common: RequestCommon::new(RP_ID, ORIGIN, b"demo-create-challenge".to_vec()),
        user: UserEntity {
            id: b"user-0001".to_vec(),
            name: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
        },
        exclude_credentials: Vec::new(),
        algorithms: vec![-7, -257],
        resident_key,
        echo_cred_props: true,
        is_conditional,
    }
}

fn report(label: &str, result: Result<CredentialResponse, AuthStatus>) {
    match result {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{label}: ok\n{json}"),
            Err(e) => println!("{label}: ok (unserializable: {e})"),
        },
        Err(status) => println!("{label}: failed with {status:?} ({status})"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("passkey_dispatch=debug,{}=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = OrchestratorConfig::from_env();
    tracing::info!(
        support_level = %config.support_level,
        legacy_available = config.legacy_available,
        hybrid_supported = config.hybrid_supported,
        "Starting dispatch demo"
    );

    let orchestrator = RequestOrchestrator::new(collaborators(), config);
    let recorder = Arc::new(LogRecorder);

    println!(
        "platform authenticator available: {}",
        orchestrator.is_platform_authenticator_available().await
    );

    let handle = orchestrator.handle_create(
        create_request(ResidentKey::Required, false),
        recorder.clone(),
    )?;
    report("create", handle.response().await);

    let handle = orchestrator.handle_create(
        create_request(ResidentKey::Required, true),
        recorder.clone(),
    )?;
    report("conditional create", handle.response().await);

    let handle = orchestrator.handle_get(get_request(Mediation::None, &[]), recorder.clone())?;
    report("modal get", handle.response().await);

    let server_side = CredentialId::new(vec![2; 16]);
    let handle = orchestrator.handle_get(
        get_request(Mediation::None, std::slice::from_ref(&server_side)),
        recorder.clone(),
    )?;
    report("get with allow list", handle.response().await);

    let handle =
        orchestrator.handle_get(get_request(Mediation::Conditional, &[]), recorder.clone())?;
    report("conditional get", handle.response().await);

    // A second request while one is in flight is refused
    let handle =
        orchestrator.handle_get(get_request(Mediation::Conditional, &[]), recorder.clone())?;
    if let Err(e) = orchestrator.handle_get(get_request(Mediation::None, &[]), recorder.clone()) {
        println!("concurrent get: {e}");
    }
    handle.cancel();
    report("cancelled conditional get", handle.response().await);

    let matching = orchestrator
        .get_matching_credential_ids(RP_ID, &[server_side, CredentialId::new(vec![9; 16])], false)
        .await;
    match matching {
        Ok(ids) => println!(
            "matching ids: {}",
            ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ),
        Err(status) => println!("matching ids: failed with {status:?}"),
    }

    Ok(())
}
