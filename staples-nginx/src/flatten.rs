//! Recursive flattening of the status document
//!
//! Walks a parsed JSON document and emits one [`Metric`] per accepted leaf:
//! - booleans become `0` / `1`, numbers and strings keep their type
//! - object keys and array indices are appended to the key path
//! - elements of a `peers` array are keyed by their resolved host identifier
//! - nulls are skipped
//!
//! Object keys are visited in sorted order (serde_json's default map).

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::filter::MetricFilter;
use crate::metric::{Metric, MetricValue, Namespace};
use crate::resolver::{HostResolver, ReverseLookup};

/// Arrays under a key with this name hold per-peer records.
pub const PEERS_KEY: &str = "peers";

pub struct Flattener<L> {
    filter: MetricFilter,
    resolver: HostResolver<L>,
    timestamp: Option<DateTime<Utc>>,
}

impl<L: ReverseLookup> Flattener<L> {
    pub fn new(filter: MetricFilter, resolver: HostResolver<L>) -> Self {
        Self {
            filter,
            resolver,
            timestamp: None,
        }
    }

    /// Stamp every metric with `timestamp` instead of the capture time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Flatten `node` found at `parent_key_path`. Never fails; malformed
    /// sub-trees only reduce the number of metrics produced.
    pub async fn flatten(&self, node: &Value, parent_key_path: &str) -> Vec<Metric> {
        let mut metrics = Vec::new();
        self.walk(node, parent_key_path.to_string(), &mut metrics).await;
        metrics
    }

    fn walk<'s>(
        &'s self,
        node: &'s Value,
        key_path: String,
        out: &'s mut Vec<Metric>,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            match node {
                Value::Bool(flag) => self.emit(&key_path, MetricValue::from_bool(*flag), out),
                Value::Number(number) => self.emit(&key_path, MetricValue::from(number), out),
                Value::String(text) => self.emit(&key_path, MetricValue::Text(text.clone()), out),
                Value::Object(map) => {
                    for (key, value) in map {
                        self.walk(value, format!("{key_path}/{key}"), out).await;
                    }
                }
                Value::Array(items) => {
                    let peers = last_segment(&key_path) == PEERS_KEY;
                    for (index, item) in items.iter().enumerate() {
                        let segment = if peers {
                            self.resolver.resolve(item, &index.to_string()).await
                        } else {
                            index.to_string()
                        };
                        self.walk(item, format!("{key_path}/{segment}"), out).await;
                    }
                }
                Value::Null => debug!(key_path = %key_path, "skipping null value"),
            }
        })
    }

    fn emit(&self, key_path: &str, value: MetricValue, out: &mut Vec<Metric>) {
        if self.filter.should_ignore(key_path) {
            return;
        }
        out.push(Metric {
            namespace: Namespace::from_key_path(key_path),
            value,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        });
    }
}

fn last_segment(key_path: &str) -> &str {
    key_path.rsplit('/').next().unwrap_or(key_path)
}
