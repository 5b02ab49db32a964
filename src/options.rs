//! Container configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable for [`ContainerOptions::allow_late_replacement`].
pub const ENV_ALLOW_LATE_REPLACEMENT: &str = "PULSE_DI_ALLOW_LATE_REPLACEMENT";
/// Environment variable for [`ContainerOptions::max_resolution_depth`].
pub const ENV_MAX_RESOLUTION_DEPTH: &str = "PULSE_DI_MAX_RESOLUTION_DEPTH";
/// Environment variable for [`ContainerOptions::warn_on_undisposed`].
pub const ENV_WARN_ON_UNDISPOSED: &str = "PULSE_DI_WARN_ON_UNDISPOSED";

/// Behaviour switches for a [`ServiceContainer`](crate::ServiceContainer).
///
/// # Examples
///
/// ```
/// use pulse_di::{ContainerOptions, ServiceContainer};
///
/// let options = ContainerOptions::from_json_str(r#"{ "max_resolution_depth": 32 }"#).unwrap();
/// assert_eq!(options.max_resolution_depth, 32);
/// assert!(!options.allow_late_replacement);
///
/// let container = ServiceContainer::with_options(options);
/// assert_eq!(container.options().max_resolution_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Accept re-registration of a key that was already resolved. Cached
    /// instances are kept; only later constructions use the new descriptor.
    pub allow_late_replacement: bool,
    /// Longest dependency chain a single resolution may build.
    pub max_resolution_depth: usize,
    /// Log a warning when a scope with pending disposers is dropped without
    /// being disposed.
    pub warn_on_undisposed: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            allow_late_replacement: false,
            max_resolution_depth: 256,
            warn_on_undisposed: true,
        }
    }
}

/// Errors raised while loading [`ContainerOptions`].
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid container options: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {var}")]
    InvalidVar { var: &'static str, value: String },
}

impl ContainerOptions {
    /// Parses options from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from the `PULSE_DI_*` environment variables. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        let mut options = Self::default();
        if let Some(value) = lookup(ENV_ALLOW_LATE_REPLACEMENT) {
            options.allow_late_replacement = parse_bool(ENV_ALLOW_LATE_REPLACEMENT, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_RESOLUTION_DEPTH) {
            let parsed = value.trim().parse::<usize>();
            options.max_resolution_depth = parsed.map_err(|_| OptionsError::InvalidVar {
                var: ENV_MAX_RESOLUTION_DEPTH,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_WARN_ON_UNDISPOSED) {
            options.warn_on_undisposed = parse_bool(ENV_WARN_ON_UNDISPOSED, value)?;
        }
        Ok(options)
    }

    /// Sets whether a key may be re-registered after it was resolved.
    pub fn with_late_replacement(mut self, allow: bool) -> Self {
        self.allow_late_replacement = allow;
        self
    }

    /// Sets the dependency chain length at which resolution gives up.
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// Sets whether dropping an undisposed scope or container logs a warning.
    pub fn with_warn_on_undisposed(mut self, warn: bool) -> Self {
        self.warn_on_undisposed = warn;
        self
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, OptionsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OptionsError::InvalidVar { var, value }),
    }
}
