use super::types::{AuthStatus, BackendFailure, OperationKind, Outcome};

/// Numeric error codes reported by the legacy platform API.
pub mod codes {
    pub const NOT_SUPPORTED_ERR: i32 = 9;
    pub const INVALID_STATE_ERR: i32 = 11;
    pub const SECURITY_ERR: i32 = 18;
    pub const NETWORK_ERR: i32 = 19;
    pub const ABORT_ERR: i32 = 20;
    pub const TIMEOUT_ERR: i32 = 23;
    pub const ENCODING_ERR: i32 = 27;
    pub const UNKNOWN_ERR: i32 = 28;
    pub const CONSTRAINT_ERR: i32 = 29;
    pub const DATA_ERR: i32 = 30;
    pub const NOT_ALLOWED_ERR: i32 = 35;
    pub const ATTESTATION_NOT_PRIVATE_ERR: i32 = 36;
}

// Backend wording used to tell apart failures that share a code. Compared
// for exact equality; a wording change upstream silently falls
// through to the generic status for that code.
const NON_EMPTY_ALLOWLIST: &str = "Authentication request must have non-empty allowList";
const NON_VALID_ALLOWED_CREDENTIALS: &str =
    "Request doesn't have a valid list of allowed credentials.";
const NO_SCREENLOCK: &str = "The device is not secured with any screen lock";
const CREDENTIAL_EXISTS: &str = "One of the excluded credentials exists on the local device";
const LOW_LEVEL_ERROR: &str = "Low level error 0x6a80";

/// Map a backend-native error into the caller-visible status and the
/// metrics-only outcome.
pub fn translate(code: i32, message: Option<&str>, op: OperationKind) -> (AuthStatus, Outcome) {
    use codes::*;

    let message = message.unwrap_or_default();
    let is_get = op == OperationKind::Get;

    let translated = match code {
        SECURITY_ERR => (AuthStatus::InvalidDomain, Outcome::SecurityError),
        TIMEOUT_ERR => (AuthStatus::NotAllowed, Outcome::UiTimeout),
        ENCODING_ERR => (AuthStatus::UnknownError, Outcome::OtherFailure),
        NOT_ALLOWED_ERR
            if message == NON_EMPTY_ALLOWLIST || message == NON_VALID_ALLOWED_CREDENTIALS =>
        {
            (AuthStatus::EmptyAllowCredentials, Outcome::RkNotSupported)
        }
        NOT_ALLOWED_ERR => (AuthStatus::NotAllowed, Outcome::PlatformNotAllowed),
        DATA_ERR | NOT_SUPPORTED_ERR => (AuthStatus::UnsupportedOperation, Outcome::OtherFailure),
        CONSTRAINT_ERR if message == NO_SCREENLOCK => (
            AuthStatus::UserVerificationUnsupported,
            Outcome::UvNotSupported,
        ),
        INVALID_STATE_ERR if message == CREDENTIAL_EXISTS => {
            let outcome = if is_get {
                Outcome::OtherFailure
            } else {
                Outcome::CredentialExcluded
            };
            (AuthStatus::CredentialExcluded, outcome)
        }
        UNKNOWN_ERR if is_get && message == LOW_LEVEL_ERROR => {
            (AuthStatus::NotAllowed, Outcome::CredentialNotRecognized)
        }
        INVALID_STATE_ERR | UNKNOWN_ERR if message == LOW_LEVEL_ERROR => {
            (AuthStatus::NotAllowed, Outcome::OtherFailure)
        }
        _ => (AuthStatus::UnknownError, Outcome::OtherFailure),
    };

    tracing::debug!(
        code,
        message,
        ?op,
        status = ?translated.0,
        outcome = ?translated.1,
        "Translated backend error"
    );
    translated
}

/// Translate any collaborator failure, native or not.
pub fn translate_failure(failure: &BackendFailure, op: OperationKind) -> (AuthStatus, Outcome) {
    match failure {
        BackendFailure::Native { code, message } => translate(*code, message.as_deref(), op),
        BackendFailure::UserCancelled => (AuthStatus::NotAllowed, Outcome::UserCancellation),
        BackendFailure::NoCredentials | BackendFailure::Unavailable(_) => {
            (AuthStatus::NotAllowed, Outcome::OtherFailure)
        }
    }
}
