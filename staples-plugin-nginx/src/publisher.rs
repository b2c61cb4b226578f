//! MQTT publishing of plugin registration and metric batches

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use staples_nginx::{ConfigPolicy, Metric, PluginMeta};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::MqttConf;

pub const REGISTRATION_TOPIC: &str = "staples/plugins/registration@v1";
pub const METRICS_TOPIC: &str = "staples/nginx/metrics@v1";

/// Registration message (plugins.registration@v1)
#[derive(Debug, Serialize)]
pub struct RegistrationMessage<'a> {
    pub instance_id: &'a str,
    pub meta: &'a PluginMeta,
    pub policy: &'a ConfigPolicy,
    pub timestamp: DateTime<Utc>,
}

/// One collection cycle (nginx.metrics@v1)
#[derive(Debug, Serialize)]
pub struct MetricsBatch<'a> {
    pub plugin: &'a str,
    pub instance_id: &'a str,
    pub metrics: &'a [Metric],
    pub collected_at: DateTime<Utc>,
}

pub struct Publisher {
    client: AsyncClient,
    instance_id: String,
}

impl Publisher {
    /// Create the MQTT client and drive its event loop in the background.
    pub fn connect(mqtt: &MqttConf, instance_id: String) -> Self {
        let client_id = format!("staples-plugin-nginx-{}", instance_id);
        let mut opts = MqttOptions::new(client_id, &mqtt.host, mqtt.port);
        opts.set_keep_alive(Duration::from_secs(30));
        opts.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(opts, 10);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => debug!("MQTT connected"),
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        Self { client, instance_id }
    }

    pub async fn register(&self, meta: &PluginMeta, policy: &ConfigPolicy) -> Result<()> {
        let registration = RegistrationMessage {
            instance_id: &self.instance_id,
            meta,
            policy,
            timestamp: Utc::now(),
        };
        let payload = serde_json::to_string(&registration)
            .context("Failed to serialize registration message")?;

        self.client
            .publish(REGISTRATION_TOPIC, QoS::AtLeastOnce, false, payload)
            .await
            .context("Failed to publish registration")?;
        debug!("Plugin registered as {}", self.instance_id);
        Ok(())
    }

    pub async fn publish_metrics(&self, plugin: &str, metrics: &[Metric]) -> Result<()> {
        let batch = MetricsBatch {
            plugin,
            instance_id: &self.instance_id,
            metrics,
            collected_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&batch).context("Failed to serialize metrics batch")?;

        self.client
            .publish(METRICS_TOPIC, QoS::AtLeastOnce, false, payload)
            .await
            .context("Failed to publish metrics batch")?;
        debug!("Published {} metrics", metrics.len());
        Ok(())
    }
}
