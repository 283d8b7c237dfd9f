use passkey_dispatch::{
    AuthStatus, BackendFailure, CredentialResponse, Outcome, RemoteDesktopOverride, ResidentKey,
    SecurityCheckResult, SupportLevel, codes,
};

use crate::common::{Script, create_reply, create_request, finish, orchestrator, settle};

#[tokio::test]
async fn test_discouraged_resident_key_create_uses_legacy_under_parallel() {
    // Given a parallel build and a create request that discourages resident keys
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::Parallel);
    let mut request = create_request(ResidentKey::Discouraged);
    request.echo_cred_props = true;

    // When the request passes the security check
    let handle = orchestrator
        .handle_create(request, script.recorder())
        .unwrap();
    script.security.next().await.reply(SecurityCheckResult::ok(false));

    // Then it is served by the legacy platform API alone
    let call = script.legacy_create.next().await;
    assert_eq!(call.request.resident_key, ResidentKey::Discouraged);
    call.reply(Ok(create_reply(1)));

    let result = finish(handle).await;
    let Ok(CredentialResponse::Created(reply)) = &result else {
        panic!("expected a created credential, got {result:?}");
    };
    assert!(reply.echo_cred_props);

    settle().await;
    assert_eq!(script.unified_create.calls(), 0);
    assert_eq!(script.identity_create.calls(), 0);
    assert!(script.outcomes().is_empty());
}

#[tokio::test]
async fn test_security_failure_short_circuits_create() {
    // Given a create request whose relying party fails validation
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::UnifiedPreferredUnlessInapplicable);
    let handle = orchestrator
        .handle_create(create_request(ResidentKey::Required), script.recorder())
        .unwrap();

    // When the security checker reports the failure
    script
        .security
        .next()
        .await
        .reply(SecurityCheckResult::failed(AuthStatus::InvalidDomain));

    // Then the caller receives it and no backend is ever queried
    assert_eq!(finish(handle).await, Err(AuthStatus::InvalidDomain));
    settle().await;
    assert_eq!(script.backend_calls(), 0);
    assert_eq!(script.outcomes(), vec![Outcome::SecurityError]);
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn test_unified_preferred_create_translates_excluded_credential() {
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::UnifiedPreferredUnlessInapplicable);
    let handle = orchestrator
        .handle_create(create_request(ResidentKey::Required), script.recorder())
        .unwrap();
    script.security.next().await.reply(SecurityCheckResult::ok(false));

    script
        .unified_create
        .next()
        .await
        .reply(Err(BackendFailure::native(
            codes::INVALID_STATE_ERR,
            "One of the excluded credentials exists on the local device",
        )));

    assert_eq!(finish(handle).await, Err(AuthStatus::CredentialExcluded));
    assert_eq!(script.outcomes(), vec![Outcome::CredentialExcluded]);
    assert_eq!(script.legacy_create.calls(), 0);
}

#[tokio::test]
async fn test_conditional_create_uses_identity_broker() {
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::LegacyOnly);
    let mut request = create_request(ResidentKey::Required);
    request.is_conditional = true;

    let handle = orchestrator.handle_create(request, script.recorder()).unwrap();
    script.security.next().await.reply(SecurityCheckResult::ok(false));
    script.identity_create.next().await.reply(Ok(create_reply(4)));

    assert!(matches!(
        finish(handle).await,
        Ok(CredentialResponse::Created(_))
    ));
    assert_eq!(script.legacy_create.calls(), 0);
}

#[tokio::test]
async fn test_remote_desktop_override_sets_origin_and_cross_origin() {
    // Given a create request relayed by a remote desktop client
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::LegacyOnly);
    let mut request = create_request(ResidentKey::Preferred);
    request.common.remote_desktop_override = Some(RemoteDesktopOverride {
        origin: "https://remote.example.com".to_string(),
        same_origin_with_ancestors: false,
    });

    let handle = orchestrator.handle_create(request, script.recorder()).unwrap();

    // When validating, the override origin is checked
    let check = script.security.next().await;
    assert_eq!(
        check.request.override_origin.as_deref(),
        Some("https://remote.example.com")
    );
    check.reply(SecurityCheckResult::ok(false));

    // Then the backend sees the cross-origin flag derived from the override
    let call = script.legacy_create.next().await;
    assert!(call.request.common.is_cross_origin);
    call.reply(Ok(create_reply(2)));

    assert!(finish(handle).await.is_ok());
}

#[tokio::test]
async fn test_user_cancelled_create_records_cancellation() {
    let script = Script::new();
    let orchestrator = orchestrator(&script, SupportLevel::LegacyOnly);
    let handle = orchestrator
        .handle_create(create_request(ResidentKey::Preferred), script.recorder())
        .unwrap();
    script.security.next().await.reply(SecurityCheckResult::ok(false));

    script
        .legacy_create
        .next()
        .await
        .reply(Err(BackendFailure::UserCancelled));

    assert_eq!(finish(handle).await, Err(AuthStatus::NotAllowed));
    assert_eq!(script.outcomes(), vec![Outcome::UserCancellation]);
}
