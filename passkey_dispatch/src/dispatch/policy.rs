use super::types::{BackendKind, DispatchInput, DispatchMode, SupportLevel};
use crate::barrier::BarrierMode;
use crate::request::{CredentialDescriptor, CredentialSummary, Mediation, ResidentKey};
use crate::status::{AuthStatus, OperationKind, Outcome};

const UNIFIED_THEN_LEGACY: DispatchMode = DispatchMode::Sequential {
    primary: BackendKind::UnifiedCredentialBroker,
    fallback: BackendKind::LegacyPlatformApi,
};

/// Decide which backend(s) serve a request. Rules are applied in priority
/// order; the first that matches wins.
pub fn decide(input: &DispatchInput) -> DispatchMode {
    let mode = decide_inner(input);
    tracing::debug!(?input, ?mode, "Dispatch decided");
    mode
}

fn decide_inner(input: &DispatchInput) -> DispatchMode {
    let support = input.support;

    // The broker's payment semantics are undefined
    if input.is_payment {
        return DispatchMode::OnlyLegacy;
    }

    if input.operation == OperationKind::Create {
        if input.conditional_create {
            return DispatchMode::OnlyIdentity;
        }
        if input.resident_key == Some(ResidentKey::Discouraged) {
            return DispatchMode::OnlyLegacy;
        }
        return match support {
            SupportLevel::UnifiedPreferredUnlessInapplicable => DispatchMode::OnlyUnified,
            _ => DispatchMode::OnlyLegacy,
        };
    }

    match input.mediation {
        Mediation::Immediate => {
            if !support.includes_unified() {
                DispatchMode::Reject {
                    status: AuthStatus::UnsupportedOperation,
                    outcome: Outcome::OtherFailure,
                }
            } else if input.has_allow_or_exclude_list {
                DispatchMode::Reject {
                    status: AuthStatus::NotAllowed,
                    outcome: Outcome::SecurityError,
                }
            } else {
                DispatchMode::OnlyUnified
            }
        }
        Mediation::Conditional => match support {
            SupportLevel::Parallel => DispatchMode::Joined(BarrierMode::RequireBoth),
            SupportLevel::UnifiedPreferredUnlessInapplicable => DispatchMode::OnlyUnified,
            _ => DispatchMode::OnlyLegacy,
        },
        Mediation::None if input.has_allow_or_exclude_list && support.includes_unified() => {
            DispatchMode::MatchingCheck
        }
        Mediation::None if !input.has_allow_or_exclude_list => match support {
            SupportLevel::Parallel => DispatchMode::Joined(BarrierMode::RequireBoth),
            SupportLevel::UnifiedPreferredUnlessInapplicable => UNIFIED_THEN_LEGACY,
            _ => DispatchMode::OnlyLegacy,
        },
        Mediation::None => DispatchMode::OnlyLegacy,
    }
}

/// Finish a [`DispatchMode::MatchingCheck`] once the legacy enumeration is in.
///
/// A legacy credential named by the allow list routes the request to legacy.
/// Otherwise, or when the enumeration failed, the broker is asked first with
/// legacy registered as its no-credential fallback.
pub fn resolve_matching_check(
    enumerated: Result<&[CredentialSummary], AuthStatus>,
    allow_list: &[CredentialDescriptor],
    support: SupportLevel,
) -> DispatchMode {
    let credentials = match enumerated {
        Ok(credentials) => credentials,
        Err(status) => {
            tracing::error!(
                ?status,
                %support,
                "Legacy enumeration failed during matching check; routing to the unified broker"
            );
            return UNIFIED_THEN_LEGACY;
        }
    };

    // Under unified-preferred the broker already serves discoverable credentials
    let skip_discoverable = support == SupportLevel::UnifiedPreferredUnlessInapplicable;

    let matched = credentials
        .iter()
        .filter(|c| !(skip_discoverable && c.is_discoverable))
        .find(|c| allow_list.iter().any(|d| d.id == c.credential_id));

    match matched {
        Some(credential) => {
            tracing::debug!(
                credential_id = %credential.credential_id,
                "Allow list matched a legacy credential"
            );
            DispatchMode::OnlyLegacy
        }
        None => {
            tracing::debug!("No legacy credential matched the allow list");
            UNIFIED_THEN_LEGACY
        }
    }
}
