mod types;

pub use types::{
    Collaborators, IdentityBroker, LegacyPlatformApi, OutcomeRecorder, PickerBridge,
    SecurityCheckParams, SecurityCheckResult, SecurityChecker, UnifiedCredentialBroker,
};
