use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::barrier::BarrierMode;
use crate::request::{Mediation, ResidentKey};
use crate::status::{AuthStatus, OperationKind, Outcome};

/// The queryable credential backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    LegacyPlatformApi,
    UnifiedCredentialBroker,
    /// Conditional create only.
    IdentityBroker,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LegacyPlatformApi => "legacy",
            Self::UnifiedCredentialBroker => "unified",
            Self::IdentityBroker => "identity",
        };
        f.write_str(name)
    }
}

/// Which backends this device or build can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportLevel {
    #[default]
    LegacyOnly,
    #[serde(rename = "unified-preferred")]
    UnifiedPreferredUnlessInapplicable,
    UnifiedIfRequired,
    Parallel,
    Disabled,
}

impl SupportLevel {
    /// Whether requests may be routed to the unified broker at all.
    pub fn includes_unified(self) -> bool {
        matches!(
            self,
            Self::UnifiedPreferredUnlessInapplicable | Self::Parallel
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyOnly => "legacy-only",
            Self::UnifiedPreferredUnlessInapplicable => "unified-preferred",
            Self::UnifiedIfRequired => "unified-if-required",
            Self::Parallel => "parallel",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown support level: {0}")]
pub struct ParseSupportLevelError(pub String);

impl FromStr for SupportLevel {
    type Err = ParseSupportLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy-only" => Ok(Self::LegacyOnly),
            "unified-preferred" => Ok(Self::UnifiedPreferredUnlessInapplicable),
            "unified-if-required" => Ok(Self::UnifiedIfRequired),
            "parallel" => Ok(Self::Parallel),
            "disabled" => Ok(Self::Disabled),
            other => Err(ParseSupportLevelError(other.to_string())),
        }
    }
}

/// Everything the routing decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchInput {
    pub operation: OperationKind,
    pub mediation: Mediation,
    /// Allow list for get, exclude list for create.
    pub has_allow_or_exclude_list: bool,
    pub is_payment: bool,
    /// Create only.
    pub resident_key: Option<ResidentKey>,
    pub conditional_create: bool,
    pub support: SupportLevel,
}

/// Which backend(s) to invoke and in what arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    OnlyLegacy,
    OnlyUnified,
    /// Ask `primary`; if it has no usable credential, ask `fallback` once.
    Sequential {
        primary: BackendKind,
        fallback: BackendKind,
    },
    /// Enumerate both backends through a barrier before showing a picker.
    Joined(BarrierMode),
    /// Enumerate legacy credentials and compare them to the allow list before
    /// choosing a backend. Resolved by [`super::resolve_matching_check`].
    MatchingCheck,
    OnlyIdentity,
    /// Refused without contacting any backend.
    Reject { status: AuthStatus, outcome: Outcome },
}
