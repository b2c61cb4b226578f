//! Staples nginx plugin - collector host adapter
//!
//! Runs the nginx collector on a fixed interval:
//! - Loads the plugin config file and applies the config policy defaults
//! - Registers the plugin (metadata + config policy) over MQTT
//! - Publishes one metric batch per collection cycle
//! - `--once` (or `once: true`) prints a single cycle as JSON instead

mod config;
mod publisher;

use anyhow::{bail, Context, Result};
use staples_nginx::{ConfigPolicy, ConfigTable, DnsLookup, NginxCollector, PluginMeta};
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::publisher::Publisher;

const DEFAULT_LOG_FILTER: &str = "staples_plugin_nginx=info,staples_nginx=info";

/// Re-register with the scheduler every this many collection cycles.
const REGISTRATION_EVERY_CYCLES: u32 = 6;

/// Upper bound for timer periods, `Instant + period` must not overflow.
const MAX_TIMER_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Apply the policy defaults and reject a config still missing required keys.
fn collection_table(policy: &ConfigPolicy, config: &ConfigTable) -> Result<ConfigTable> {
    let table = policy.apply(config);
    let missing = policy.missing_required(&table);
    if !missing.is_empty() {
        bail!("missing required config keys: {}", missing.join(", "));
    }
    Ok(table)
}

fn collection_period(interval_secs: u64) -> Duration {
    Duration::from_secs(interval_secs.max(1)).min(MAX_TIMER_PERIOD)
}

fn registration_period(cycle: Duration) -> Duration {
    cycle
        .saturating_mul(REGISTRATION_EVERY_CYCLES)
        .min(MAX_TIMER_PERIOD)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cfg = config::load_config().await;
    let once = cfg.once || std::env::args().any(|arg| arg == "--once");

    let meta = PluginMeta::nginx();
    let policy = ConfigPolicy::nginx();
    let table = collection_table(&policy, &cfg.config).context("Invalid plugin config")?;

    let lookup = DnsLookup::from_system().context("Failed to set up DNS resolver")?;
    let collector =
        NginxCollector::new(&cfg.settings, lookup).context("Failed to create nginx collector")?;

    if once {
        let metrics = collector
            .collect_metrics(&table)
            .await
            .context("Collection failed")?;
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    info!("Staples nginx plugin v{} starting", env!("CARGO_PKG_VERSION"));

    let instance_id = uuid::Uuid::new_v4().to_string();
    let publisher = Publisher::connect(&cfg.mqtt, instance_id);
    publisher
        .register(&meta, &policy)
        .await
        .context("Failed to register plugin")?;

    let cycle = collection_period(cfg.interval_secs);
    let mut collect_timer = interval(cycle);
    let mut registration_timer = interval(registration_period(cycle));
    // first tick of each interval fires immediately, registration already happened
    registration_timer.tick().await;

    loop {
        tokio::select! {
            _ = collect_timer.tick() => {
                match collector.collect_metrics(&table).await {
                    Ok(metrics) => {
                        if let Err(e) = publisher.publish_metrics(&meta.name, &metrics).await {
                            error!("Failed to publish metrics: {:#}", e);
                        }
                    }
                    Err(e) => error!("Collection cycle failed: {}", e),
                }
            }

            _ = registration_timer.tick() => {
                if let Err(e) = publisher.register(&meta, &policy).await {
                    error!("Failed to re-register: {:#}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staples_nginx::{ConfigValue, StringRule, SERVER_URL_KEY};

    #[test]
    fn test_collection_table_fills_default_url() {
        let table = collection_table(&ConfigPolicy::nginx(), &ConfigTable::new()).unwrap();
        assert_eq!(
            table[SERVER_URL_KEY].as_str(),
            Some("http://localhost/status")
        );
    }

    #[test]
    fn test_collection_table_rejects_missing_required_key() {
        let policy = ConfigPolicy {
            namespace: ["staples", "nginx"].into_iter().collect(),
            rules: vec![StringRule {
                key: "token".to_string(),
                required: true,
                default: None,
            }],
        };

        let err = collection_table(&policy, &ConfigTable::new()).unwrap_err();
        assert!(err.to_string().contains("token"));

        let config = ConfigTable::from([("token".to_string(), ConfigValue::Str("s3cret".into()))]);
        assert!(collection_table(&policy, &config).is_ok());
    }

    #[test]
    fn test_registration_period_is_a_multiple_of_the_cycle() {
        assert_eq!(
            registration_period(Duration::from_secs(10)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_collection_period_bounds() {
        assert_eq!(collection_period(0), Duration::from_secs(1));
        assert_eq!(collection_period(10), Duration::from_secs(10));
        assert_eq!(collection_period(u64::MAX), MAX_TIMER_PERIOD);
    }

    #[test]
    fn test_registration_period_is_capped_on_huge_interval() {
        assert_eq!(registration_period(Duration::from_secs(u64::MAX)), MAX_TIMER_PERIOD);
        assert_eq!(
            registration_period(collection_period(u64::MAX)),
            MAX_TIMER_PERIOD
        );
    }

    #[tokio::test]
    async fn test_capped_periods_build_timers() {
        let cycle = collection_period(u64::MAX);
        let mut timer = interval(registration_period(cycle));
        timer.tick().await;
    }
}
