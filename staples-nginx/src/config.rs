//! Collector configuration
//!
//! Handles:
//! - The scheduler-supplied config table (`nginx_server_url`, ...)
//! - Collector settings: HTTP and DNS timeouts, metric ignore rules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Config table handed over by the collection scheduler.
pub type ConfigTable = BTreeMap<String, ConfigValue>;

/// A single typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

/// Literal that disables an ignore list.
pub const DISABLED_SENTINEL: &str = "nil";

/// Metric ignore rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreRules {
    /// Matched against the last segment of a key path.
    pub child: Vec<String>,
    /// Matched against the whole key path.
    pub metric: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            child: vec!["server".to_string()],
            metric: Vec::new(),
        }
    }
}

/// Settings for one collector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub http_timeout_secs: u64,
    pub dns_timeout_ms: u64,
    pub ignore: IgnoreRules,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 5,
            dns_timeout_ms: 2000,
            ignore: IgnoreRules::default(),
        }
    }
}

impl CollectorSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CollectorSettings::default();
        assert_eq!(settings.http_timeout(), Duration::from_secs(5));
        assert_eq!(settings.dns_timeout(), Duration::from_secs(2));
        assert_eq!(settings.ignore.child, vec!["server".to_string()]);
        assert!(settings.ignore.metric.is_empty());
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: CollectorSettings =
            serde_json::from_str(r#"{"dns_timeout_ms": 250}"#).unwrap();
        assert_eq!(settings.dns_timeout(), Duration::from_millis(250));
        assert_eq!(settings.http_timeout_secs, 5);
        assert_eq!(settings.ignore, IgnoreRules::default());
    }

    #[test]
    fn test_config_table_values() {
        let table: ConfigTable = serde_json::from_str(
            r#"{"nginx_server_url": "http://localhost/status", "retries": 3, "debug": true}"#,
        )
        .unwrap();
        assert_eq!(table["nginx_server_url"].as_str(), Some("http://localhost/status"));
        assert_eq!(table["retries"], ConfigValue::Int(3));
        assert_eq!(table["debug"].type_name(), "bool");
        assert_eq!(table["retries"].as_str(), None);
    }
}
