//! Metric data model shared by the flattener and the host adapter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered namespace segments identifying a metric, e.g.
/// `["staples", "nginx", "connections", "active"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// Convert an internal key path (`staples/nginx/a.b/c`) into namespace
    /// segments. Dots become dashes, then the path is split on `/`.
    /// Empty segments are kept in place.
    pub fn from_key_path(key_path: &str) -> Self {
        let replaced = key_path.replace('.', "-");
        Self(replaced.split('/').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Namespace {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Scalar value carried by a metric.
///
/// Booleans are reported as `Int(0)` / `Int(1)`. `UInt` only appears for
/// integers that do not fit in an `i64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn from_bool(flag: bool) -> Self {
        MetricValue::Int(i64::from(flag))
    }
}

impl From<&serde_json::Number> for MetricValue {
    fn from(number: &serde_json::Number) -> Self {
        if let Some(v) = number.as_i64() {
            MetricValue::Int(v)
        } else if let Some(v) = number.as_u64() {
            MetricValue::UInt(v)
        } else {
            // serde_json without arbitrary_precision always has an f64 view
            MetricValue::Float(number.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::UInt(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

/// One flattened metric, created once per accepted leaf node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub namespace: Namespace,
    pub value: MetricValue,
    pub timestamp: DateTime<Utc>,
}
