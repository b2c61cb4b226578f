//! Plugin configuration file
//!
//! YAML file named by `STAPLES_NGINX_CONFIG` (default `nginx.yaml`):
//!
//! ```yaml
//! config:
//!   nginx_server_url: http://localhost/status
//! settings:
//!   http_timeout_secs: 5
//!   dns_timeout_ms: 2000
//!   ignore:
//!     child: [server]
//!     metric: []
//! mqtt:
//!   host: localhost
//!   port: 1883
//! interval_secs: 10
//! ```

use serde::{Deserialize, Serialize};
use staples_nginx::{CollectorSettings, ConfigTable};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "STAPLES_NGINX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "nginx.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    /// Table handed to the collector on every cycle
    pub config: ConfigTable,
    pub settings: CollectorSettings,
    pub mqtt: MqttConf,
    pub interval_secs: u64,
    /// Collect once, print the metrics as JSON and exit
    pub once: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            config: ConfigTable::new(),
            settings: CollectorSettings::default(),
            mqtt: MqttConf::default(),
            interval_secs: 10,
            once: false,
        }
    }
}

pub async fn load_config() -> PluginConfig {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_config_from(Path::new(&path)).await
}

/// Read the config file, falling back to defaults when it is missing,
/// empty or invalid.
pub async fn load_config_from(path: &Path) -> PluginConfig {
    if !path.exists() {
        warn!("No config file at {}, using defaults", path.display());
        return PluginConfig::default();
    }

    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            return PluginConfig::default();
        }
    };
    if txt.trim().is_empty() {
        return PluginConfig::default();
    }

    match serde_yaml::from_str(&txt) {
        Ok(cfg) => {
            info!("Loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("Invalid config {}: {}, using defaults", path.display(), e);
            PluginConfig::default()
        }
    }
}
