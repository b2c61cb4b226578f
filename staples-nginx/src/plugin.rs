//! Plugin metadata and config policy advertised to the collection scheduler

use serde::{Deserialize, Serialize};

use crate::collector::SERVER_URL_KEY;
use crate::config::{ConfigTable, ConfigValue};
use crate::metric::Namespace;

/// Kind of plugin, as understood by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Collector,
}

/// How the scheduler routes tasks between plugin instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    Default,
}

/// Metadata sent with the plugin registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMeta {
    /// Unique plugin name
    pub name: String,
    /// Plugin version, bumped on metric layout changes
    pub version: u32,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Content types accepted from the scheduler
    pub accepted_content_types: Vec<String>,
    /// Content types of the returned metrics
    pub returned_content_types: Vec<String>,
    /// Plugin runs without TLS between it and the scheduler
    pub unsecure: bool,
    pub routing: RoutingStrategy,
    /// How long the scheduler may serve cached metrics
    pub cache_ttl_ms: u64,
}

impl PluginMeta {
    pub const CONTENT_TYPE: &'static str = "snap.gob";

    pub fn nginx() -> Self {
        Self {
            name: "nginx".to_string(),
            version: 1,
            plugin_type: PluginType::Collector,
            accepted_content_types: vec![Self::CONTENT_TYPE.to_string()],
            returned_content_types: vec![Self::CONTENT_TYPE.to_string()],
            unsecure: true,
            routing: RoutingStrategy::Default,
            cache_ttl_ms: 1100,
        }
    }
}

/// A string-valued config rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringRule {
    pub key: String,
    pub required: bool,
    pub default: Option<String>,
}

/// Config rules for the metrics below `namespace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPolicy {
    pub namespace: Namespace,
    pub rules: Vec<StringRule>,
}

impl ConfigPolicy {
    pub fn nginx() -> Self {
        Self {
            namespace: ["staples", "nginx"].into_iter().collect(),
            rules: vec![StringRule {
                key: SERVER_URL_KEY.to_string(),
                required: true,
                default: Some("http://localhost/status".to_string()),
            }],
        }
    }

    /// Copy of `table` with defaults filled in for absent keys.
    /// Present values are left untouched, even when mistyped.
    pub fn apply(&self, table: &ConfigTable) -> ConfigTable {
        let mut applied = table.clone();
        for rule in &self.rules {
            if let Some(default) = &rule.default {
                applied
                    .entry(rule.key.clone())
                    .or_insert_with(|| ConfigValue::Str(default.clone()));
            }
        }
        applied
    }

    /// Required keys still missing from `table` once defaults are applied.
    pub fn missing_required(&self, table: &ConfigTable) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.required && rule.default.is_none() && !table.contains_key(&rule.key))
            .map(|rule| rule.key.as_str())
            .collect()
    }
}
