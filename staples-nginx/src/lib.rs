//! Staples nginx collector
//!
//! Turns the nginx status JSON document into flat, namespaced metrics:
//! - Fetches the status document over HTTP (single attempt, bounded timeout)
//! - Flattens nested objects and arrays into `staples/nginx/...` namespaces
//! - Replaces `peers` array indices with stable peer host identifiers
//! - Suppresses metrics matching the configured ignore rules

pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod flatten;
pub mod metric;
pub mod plugin;
pub mod resolver;

pub use collector::{NginxCollector, ROOT_PREFIX, SERVER_URL_KEY};
pub use config::{CollectorSettings, ConfigTable, ConfigValue, IgnoreRules};
pub use error::CollectError;
pub use fetcher::Fetcher;
pub use filter::MetricFilter;
pub use flatten::Flattener;
pub use metric::{Metric, MetricValue, Namespace};
pub use plugin::{ConfigPolicy, PluginMeta, StringRule};
pub use resolver::{DnsLookup, HostResolver, LookupError, ReverseLookup};
