use std::{env, sync::LazyLock};

use crate::dispatch::SupportLevel;

pub(crate) static PASSKEY_DISPATCH_SUPPORT_LEVEL: LazyLock<SupportLevel> =
    LazyLock::new(read_support_level);

pub(crate) static PASSKEY_DISPATCH_LEGACY_AVAILABLE: LazyLock<bool> =
    LazyLock::new(|| read_bool("PASSKEY_DISPATCH_LEGACY_AVAILABLE", true));

pub(crate) static PASSKEY_DISPATCH_HYBRID_SUPPORTED: LazyLock<bool> =
    LazyLock::new(|| read_bool("PASSKEY_DISPATCH_HYBRID_SUPPORTED", false));

fn read_support_level() -> SupportLevel {
    match env::var("PASSKEY_DISPATCH_SUPPORT_LEVEL") {
        Err(_) => SupportLevel::default(),
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid support level: {}. Using default '{}'",
                v,
                SupportLevel::default()
            );
            SupportLevel::default()
        }),
    }
}

fn read_bool(name: &str, default: bool) -> bool {
    env::var(name).map_or(default, |v| match v.to_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        invalid => {
            tracing::warn!("Invalid {}: {}. Using default '{}'", name, invalid, default);
            default
        }
    })
}

/// Per-build routing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub support_level: SupportLevel,
    /// Whether the legacy platform API is reachable on this device.
    pub legacy_available: bool,
    /// Whether the picker offers the "use another device" option.
    pub hybrid_supported: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            support_level: SupportLevel::default(),
            legacy_available: true,
            hybrid_supported: false,
        }
    }
}

impl OrchestratorConfig {
    /// Configuration from the `PASSKEY_DISPATCH_*` environment variables,
    /// read once per process.
    pub fn from_env() -> Self {
        Self {
            support_level: *PASSKEY_DISPATCH_SUPPORT_LEVEL,
            legacy_available: *PASSKEY_DISPATCH_LEGACY_AVAILABLE,
            hybrid_supported: *PASSKEY_DISPATCH_HYBRID_SUPPORTED,
        }
    }

    pub fn with_support_level(mut self, support_level: SupportLevel) -> Self {
        self.support_level = support_level;
        self
    }
}
