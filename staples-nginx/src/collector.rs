//! Collector facade used by the host adapter
//!
//! One cycle = read `nginx_server_url` from the config table, fetch the status
//! document once, flatten it under `staples/nginx`.

use reqwest::Url;
use tracing::{info, warn};

use crate::config::{CollectorSettings, ConfigTable};
use crate::error::CollectError;
use crate::fetcher::Fetcher;
use crate::filter::MetricFilter;
use crate::flatten::Flattener;
use crate::metric::{Metric, Namespace};
use crate::resolver::{HostResolver, ReverseLookup};

/// Key path prefix of every metric.
pub const ROOT_PREFIX: &str = "staples/nginx";

/// Config key holding the status endpoint URL.
pub const SERVER_URL_KEY: &str = "nginx_server_url";

pub struct NginxCollector<L> {
    fetcher: Fetcher,
    flattener: Flattener<L>,
}

impl<L: ReverseLookup> NginxCollector<L> {
    pub fn new(settings: &CollectorSettings, lookup: L) -> Result<Self, CollectError> {
        let fetcher = Fetcher::new(settings.http_timeout())?;
        let flattener = Flattener::new(
            MetricFilter::from_rules(&settings.ignore),
            HostResolver::new(lookup, settings.dns_timeout()),
        );
        Ok(Self { fetcher, flattener })
    }

    /// Run one collection cycle and return every flattened metric.
    pub async fn collect_metrics(&self, config: &ConfigTable) -> Result<Vec<Metric>, CollectError> {
        let url = server_url(config)?;

        let document = match self.fetcher.fetch(&url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(%url, error = %e, "nginx status fetch failed");
                return Err(e);
            }
        };

        let metrics = self.flattener.flatten(&document, ROOT_PREFIX).await;
        info!(%url, count = metrics.len(), "nginx metrics collected");
        Ok(metrics)
    }

    /// Discovery: the namespaces a collection cycle currently produces.
    pub async fn get_metric_types(&self, config: &ConfigTable) -> Result<Vec<Namespace>, CollectError> {
        let metrics = self.collect_metrics(config).await?;
        Ok(metrics.into_iter().map(|m| m.namespace).collect())
    }
}

fn server_url(config: &ConfigTable) -> Result<Url, CollectError> {
    let value = config
        .get(SERVER_URL_KEY)
        .ok_or_else(|| CollectError::MissingConfig(SERVER_URL_KEY.to_string()))?;

    let raw = value.as_str().ok_or_else(|| {
        CollectError::invalid_config(
            SERVER_URL_KEY,
            format!("expected a string, got {}", value.type_name()),
        )
    })?;
    if raw.trim().is_empty() {
        return Err(CollectError::invalid_config(SERVER_URL_KEY, "URL is empty"));
    }

    Url::parse(raw).map_err(|e| CollectError::invalid_config(SERVER_URL_KEY, e.to_string()))
}
