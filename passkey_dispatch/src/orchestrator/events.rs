use super::handle::PickerEvent;
use crate::backend::{Collaborators, SecurityCheckParams, SecurityCheckResult};
use crate::dispatch::BackendKind;
use crate::request::{CreateRequest, CredentialResponse, CredentialSummary, GetRequest};
use crate::status::{AuthStatus, BackendFailure, OperationKind};

/// Why the legacy credentials are being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumerationPurpose {
    /// Candidates for the picker.
    CandidateList,
    /// Comparison against the allow list before choosing a backend.
    MatchingCheck,
}

/// Everything that drives a request forward, delivered to its event loop.
#[derive(Debug)]
pub(crate) enum Event {
    SecurityChecked(SecurityCheckResult),
    Enumerated {
        purpose: EnumerationPurpose,
        result: Result<Vec<CredentialSummary>, BackendFailure>,
    },
    Prefetched(Result<Vec<CredentialSummary>, BackendFailure>),
    Replied {
        backend: BackendKind,
        result: Result<CredentialResponse, BackendFailure>,
    },
    Picker(PickerEvent),
    Cancel,
}

/// The event a call answers with, kept so a call that never returns can
/// still be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplySlot {
    SecurityCheck,
    Reply(BackendKind),
    Enumerate(EnumerationPurpose),
    Prefetch,
}

impl ReplySlot {
    pub(crate) fn failed(self, failure: BackendFailure) -> Event {
        match self {
            Self::SecurityCheck => {
                Event::SecurityChecked(SecurityCheckResult::failed(AuthStatus::UnknownError))
            }
            Self::Reply(backend) => Event::Replied {
                backend,
                result: Err(failure),
            },
            Self::Enumerate(purpose) => Event::Enumerated {
                purpose,
                result: Err(failure),
            },
            Self::Prefetch => Event::Prefetched(Err(failure)),
        }
    }
}

/// One asynchronous call to a collaborator.
#[derive(Debug)]
pub(crate) enum BackendCall {
    SecurityCheck {
        op: OperationKind,
        params: SecurityCheckParams,
    },
    Create {
        backend: BackendKind,
        request: CreateRequest,
    },
    Get {
        backend: BackendKind,
        request: GetRequest,
    },
    HybridGet(GetRequest),
    Enumerate {
        rp_id: String,
        purpose: EnumerationPurpose,
    },
    Prefetch(GetRequest),
}

impl BackendCall {
    /// The backend this call goes to, if any.
    pub(crate) fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::SecurityCheck { .. } => None,
            Self::Create { backend, .. } | Self::Get { backend, .. } => Some(*backend),
            Self::HybridGet(_) | Self::Enumerate { .. } => Some(BackendKind::LegacyPlatformApi),
            Self::Prefetch(_) => Some(BackendKind::UnifiedCredentialBroker),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::SecurityCheck { .. } => "security_check",
            Self::Create { .. } => "create",
            Self::Get { .. } => "get",
            Self::HybridGet(_) => "hybrid_get",
            Self::Enumerate { .. } => "enumerate",
            Self::Prefetch(_) => "prefetch",
        }
    }

    /// Where this call's reply lands in the event loop.
    pub(crate) fn reply_slot(&self) -> ReplySlot {
        match self {
            Self::SecurityCheck { .. } => ReplySlot::SecurityCheck,
            Self::Create { backend, .. } | Self::Get { backend, .. } => ReplySlot::Reply(*backend),
            Self::HybridGet(_) => ReplySlot::Reply(BackendKind::LegacyPlatformApi),
            Self::Enumerate { purpose, .. } => ReplySlot::Enumerate(*purpose),
            Self::Prefetch(_) => ReplySlot::Prefetch,
        }
    }

    /// Run the call against the matching collaborator and wrap its reply.
    pub(crate) async fn execute(self, collaborators: &Collaborators) -> Event {
        match self {
            Self::SecurityCheck { op, params } => {
                let result = match op {
                    OperationKind::Create => collaborators.security.check_create(params).await,
                    OperationKind::Get => collaborators.security.check_get(params).await,
                };
                Event::SecurityChecked(result)
            }
            Self::Create { backend, request } => {
                let result = match backend {
                    BackendKind::LegacyPlatformApi => {
                        collaborators.legacy.make_credential(request).await
                    }
                    BackendKind::UnifiedCredentialBroker => {
                        collaborators.unified.make_credential(request).await
                    }
                    BackendKind::IdentityBroker => {
                        collaborators.identity.create_credential(request).await
                    }
                };
                Event::Replied {
                    backend,
                    result: result.map(CredentialResponse::Created),
                }
            }
            Self::Get { backend, request } => {
                let result = match backend {
                    BackendKind::LegacyPlatformApi => collaborators
                        .legacy
                        .get_assertion(request)
                        .await
                        .map(CredentialResponse::Asserted),
                    BackendKind::UnifiedCredentialBroker => collaborators
                        .unified
                        .get_credential(request)
                        .await
                        .map(CredentialResponse::from),
                    BackendKind::IdentityBroker => Err(BackendFailure::Unavailable(
                        "identity broker does not serve get requests".to_string(),
                    )),
                };
                Event::Replied { backend, result }
            }
            Self::HybridGet(request) => Event::Replied {
                backend: BackendKind::LegacyPlatformApi,
                result: collaborators
                    .legacy
                    .hybrid_get_assertion(request)
                    .await
                    .map(CredentialResponse::Asserted),
            },
            Self::Enumerate { rp_id, purpose } => Event::Enumerated {
                purpose,
                result: collaborators.legacy.enumerate_credentials(&rp_id).await,
            },
            Self::Prefetch(request) => {
                Event::Prefetched(collaborators.unified.prefetch_candidates(request).await)
            }
        }
    }
}
