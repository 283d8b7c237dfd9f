use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized failure status surfaced to the caller.
///
/// Every backend-specific failure is translated into one of these before it
/// leaves the crate; callers never see backend-native codes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthStatus {
    /// The relying party ID or origin failed validation
    #[error("Invalid domain")]
    InvalidDomain,

    /// Generic denial, timeout or user cancellation
    #[error("The operation either timed out or was not allowed")]
    NotAllowed,

    /// The backend only supports resident keys and the allow list was empty
    #[error("Empty allow credentials")]
    EmptyAllowCredentials,

    /// One of the excluded credentials already exists on the authenticator
    #[error("Credential excluded")]
    CredentialExcluded,

    /// User verification was required but the device cannot perform it
    #[error("User verification unsupported")]
    UserVerificationUnsupported,

    /// The request asked for something this build cannot do
    #[error("Unsupported operation")]
    UnsupportedOperation,

    /// The caller cancelled the request
    #[error("Aborted by caller")]
    AbortedByCaller,

    #[error("Unknown error")]
    UnknownError,
}

/// Fine-grained failure classification, recorded for metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    SecurityError,
    UiTimeout,
    RkNotSupported,
    PlatformNotAllowed,
    UvNotSupported,
    CredentialExcluded,
    CredentialNotRecognized,
    UserCancellation,
    #[default]
    OtherFailure,
}

impl Outcome {
    /// Stable numeric code reported to the outcome recorder.
    pub fn code(self) -> u8 {
        match self {
            Self::SecurityError => 1,
            Self::UiTimeout => 2,
            Self::RkNotSupported => 3,
            Self::PlatformNotAllowed => 4,
            Self::UvNotSupported => 5,
            Self::CredentialExcluded => 6,
            Self::CredentialNotRecognized => 7,
            Self::UserCancellation => 8,
            Self::OtherFailure => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Get,
}

/// Failure reported by a backend collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// Backend-native error code with its optional message
    #[error("Backend error {code}: {}", message.as_deref().unwrap_or("<no message>"))]
    Native { code: i32, message: Option<String> },

    /// The backend's own prompt was dismissed by the user
    #[error("User cancelled the backend prompt")]
    UserCancelled,

    /// The backend has no credential usable for this request
    #[error("No usable credential")]
    NoCredentials,

    /// The call could not be delivered to the backend
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendFailure {
    pub fn native(code: i32, message: impl Into<String>) -> Self {
        Self::Native {
            code,
            message: Some(message.into()),
        }
    }
}
