//! passkey_dispatch - Credential request orchestration across on-device backends
//!
//! This crate routes a single WebAuthn create or get request to the legacy
//! platform API, the unified credential broker, or both, runs the credential
//! picker session for conditional requests, and normalizes every backend
//! failure into one caller-facing [`AuthStatus`].

mod backend;
mod barrier;
mod conditional;
mod config;
mod dispatch;
mod orchestrator;
mod request;
mod status;

pub use backend::{
    Collaborators, IdentityBroker, LegacyPlatformApi, OutcomeRecorder, PickerBridge,
    SecurityCheckParams, SecurityCheckResult, SecurityChecker, UnifiedCredentialBroker,
};

pub use barrier::{Barrier, BarrierDecision, BarrierMode, Branch};

pub use conditional::{
    CancelStep, ConditionalSession, EnumerationStep, ReplyStep, SelectionRejected, SessionState,
    ValidationStep,
};

pub use config::OrchestratorConfig;

pub use dispatch::{
    BackendKind, DispatchInput, DispatchMode, ParseSupportLevelError, SupportLevel, decide,
    resolve_matching_check,
};

pub use orchestrator::{
    Canceller, OrchestratorError, PickerEvent, RequestHandle, RequestId, RequestOrchestrator,
    SelectionSender,
};

pub use request::{
    CreateReply, CreateRequest, CredentialDescriptor, CredentialId, CredentialRequest,
    CredentialResponse, CredentialSummary, GetCredentialReply, GetReply, GetRequest, Mediation,
    PasswordReply, PaymentContext, RemoteDesktopOverride, RequestCommon, ResidentKey, Transport,
    UserEntity,
};

pub use status::{
    AuthStatus, BackendFailure, OperationKind, Outcome, codes, translate, translate_failure,
};
