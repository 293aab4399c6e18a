//! Runtime Configuration
//!
//! Tunables for the update engine. A config is installed per thread with
//! [`Runtime::configure`](crate::reactive::Runtime::configure); threads that
//! never install one use [`RuntimeConfig::default`].
//!
//! Configs can be loaded from JSON, with every field optional:
//!
//! ```rust
//! use trellis_core::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json(r#"{ "max_depth": 64 }"#).unwrap();
//! assert_eq!(config.max_depth, 64);
//! assert!(config.warn_on_duplicate_keys);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default limit on nested write notifications.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How deep write notifications may nest before a write is refused.
    pub max_depth: usize,

    /// Whether keyed reconcilers log a warning for repeated keys.
    /// Repeated keys are skipped either way.
    pub warn_on_duplicate_keys: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            warn_on_duplicate_keys: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = RuntimeConfig::from_json(r#"{ "warn_on_duplicate_keys": false }"#).unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.warn_on_duplicate_keys);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = RuntimeConfig::from_json(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDepth));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = RuntimeConfig::from_json("{ max_depth: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
