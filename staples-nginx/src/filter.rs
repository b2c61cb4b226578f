use crate::config::{IgnoreRules, DISABLED_SENTINEL};

/// Decides whether a candidate metric is suppressed.
///
/// The child list matches on the last `/` segment of a key path, at any
/// depth. The metric list matches on the full key path.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    child: Vec<String>,
    metric: Vec<String>,
}

impl MetricFilter {
    pub fn new<C, M>(child: C, metric: M) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            child: normalize(child),
            metric: normalize(metric),
        }
    }

    pub fn from_rules(rules: &IgnoreRules) -> Self {
        Self::new(rules.child.iter().cloned(), rules.metric.iter().cloned())
    }

    pub fn should_ignore(&self, key_path: &str) -> bool {
        let last = key_path.rsplit('/').next().unwrap_or(key_path);
        self.child.iter().any(|name| name == last) || self.metric.iter().any(|path| path == key_path)
    }
}

fn normalize<I>(list: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let list: Vec<String> = list.into_iter().map(Into::into).collect();
    if list.len() == 1 && list[0].eq_ignore_ascii_case(DISABLED_SENTINEL) {
        return Vec::new();
    }
    list
}
