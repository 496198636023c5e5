//! # Engine Configuration
//!
//! Typed configuration for the lifecycle engine, loaded from an optional YAML
//! file plus `STEWARD_`-prefixed environment overrides. Every field carries a
//! default so embedders can construct the engine with no configuration at all.

use serde::{Deserialize, Serialize};

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Recurring occurrence projection settings
    pub recurrence: RecurrenceConfig,

    /// Outbound notification intent settings
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrenceConfig {
    /// Maximum distance of a recurrence terminal date past the reference date.
    /// Rules beyond the horizon are rejected, never truncated.
    pub horizon_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Capacity of the in-process broadcast channel used by the default
    /// notification dispatcher.
    pub channel_capacity: usize,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self { horizon_days: 365 }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recurrence: RecurrenceConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `steward.{yaml,toml,json}` in the working
    /// directory (optional) with `STEWARD_`-prefixed environment overrides,
    /// e.g. `STEWARD_RECURRENCE__HORIZON_DAYS=180`.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("steward").required(false))
            .add_source(config::Environment::with_prefix("STEWARD").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.recurrence.horizon_days, 365);
        assert_eq!(config.notifications.channel_capacity, 1024);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = EngineConfig::load().expect("load should succeed without a file");
        assert_eq!(config.recurrence.horizon_days, 365);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"recurrence": {"horizon_days": 90}}"#).unwrap();
        assert_eq!(config.recurrence.horizon_days, 90);
        assert_eq!(config.notifications.channel_capacity, 1024);
    }
}
