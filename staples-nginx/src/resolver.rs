//! Peer hostname resolution
//!
//! Every element of a `peers` array gets a stable namespace segment instead of
//! its numeric index:
//! - IPv4 (`a.b.c.d:port`) and bracketed IPv6 (`[addr]:port`) addresses are
//!   reverse-resolved through DNS, each lookup bounded by a timeout
//! - Anything else, or any failed lookup, falls back to the md5 of the raw
//!   address so the segment stays stable across cycles
//!
//! The result is always prefixed with `host_id_` and sanitized for use as a
//! namespace segment.

use futures::future::BoxFuture;
use hickory_resolver::TokioResolver;
use md5::{Digest, Md5};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Tag prepended to every peer identifier.
pub const HOST_ID_PREFIX: &str = "host_id_";

/// Number of dots that marks an address as IPv4 (port suffix included).
const IPV4_DOT_COUNT: usize = 3;

/// Characters replaced with `_` in peer identifiers.
const UNSAFE_CHARS: &[char] = &['.', '/', '\\', ':', '%'];

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("resolver setup failed: {0}")]
    Setup(String),
    #[error("reverse lookup failed: {0}")]
    Failed(String),
}

/// Reverse (PTR) lookup of an IP address.
pub trait ReverseLookup: Send + Sync {
    fn reverse(&self, ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, LookupError>>;
}

/// DNS reverse lookup backed by the system resolver configuration.
pub struct DnsLookup {
    resolver: TokioResolver,
}

impl DnsLookup {
    pub fn from_system() -> Result<Self, LookupError> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| LookupError::Setup(e.to_string()))?
            .build();
        Ok(Self { resolver })
    }
}

impl ReverseLookup for DnsLookup {
    fn reverse(&self, ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, LookupError>> {
        Box::pin(async move {
            let lookup = self
                .resolver
                .reverse_lookup(ip)
                .await
                .map_err(|e| LookupError::Failed(e.to_string()))?;
            Ok(lookup.iter().map(|name| name.to_string()).collect())
        })
    }
}

/// Builds `host_id_*` segments for peer records.
pub struct HostResolver<L> {
    lookup: L,
    lookup_timeout: Duration,
}

impl<L: ReverseLookup> HostResolver<L> {
    pub fn new(lookup: L, lookup_timeout: Duration) -> Self {
        Self {
            lookup,
            lookup_timeout,
        }
    }

    /// Produce the namespace segment for one peer record.
    ///
    /// `fallback` (the array index) is used as the address when the record
    /// carries no string `server` field. Never fails.
    pub async fn resolve(&self, record: &Value, fallback: &str) -> String {
        let candidate = record
            .get("server")
            .and_then(Value::as_str)
            .unwrap_or(fallback);

        let resolved = match address_part(candidate) {
            Some(addr) => self.reverse(addr).await,
            None => None,
        };

        let tagged = match resolved {
            Some(names) => format!("{HOST_ID_PREFIX}{names}"),
            None => format!("{HOST_ID_PREFIX}{}", md5_hex(candidate)),
        };
        sanitize(&tagged)
    }

    async fn reverse(&self, addr: &str) -> Option<String> {
        let ip: IpAddr = match addr.parse() {
            Ok(ip) => ip,
            Err(e) => {
                debug!(addr, error = %e, "peer address is not an IP literal");
                return None;
            }
        };

        match timeout(self.lookup_timeout, self.lookup.reverse(ip)).await {
            Ok(Ok(names)) if !names.is_empty() => Some(names.join(".")),
            Ok(Ok(_)) => {
                debug!(%ip, "reverse lookup returned no names");
                None
            }
            Ok(Err(e)) => {
                debug!(%ip, error = %e, "reverse lookup failed");
                None
            }
            Err(_) => {
                warn!(%ip, timeout = ?self.lookup_timeout, "reverse lookup timeout");
                None
            }
        }
    }
}

/// Extract the IP part of an IPv4-shaped or `::`-bearing IPv6 address,
/// `None` when the candidate has neither shape.
fn address_part(candidate: &str) -> Option<&str> {
    if candidate.matches('.').count() == IPV4_DOT_COUNT {
        candidate.split(':').next()
    } else if candidate.contains("::") {
        candidate
            .split(']')
            .next()
            .map(|s| s.trim_start_matches('['))
    } else {
        None
    }
}

fn md5_hex(text: &str) -> String {
    format!("{:x}", Md5::digest(text.as_bytes()))
}

fn sanitize(identifier: &str) -> String {
    identifier.trim_end_matches('.').replace(UNSAFE_CHARS, "_")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory PTR table, unknown addresses fail.
    #[derive(Default)]
    pub(crate) struct StaticLookup {
        pub names: HashMap<IpAddr, Vec<String>>,
    }

    impl StaticLookup {
        pub fn with(mut self, ip: &str, names: &[&str]) -> Self {
            self.names.insert(
                ip.parse().unwrap(),
                names.iter().map(|n| n.to_string()).collect(),
            );
            self
        }
    }

    impl ReverseLookup for StaticLookup {
        fn reverse(&self, ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, LookupError>> {
            let result = self
                .names
                .get(&ip)
                .cloned()
                .ok_or_else(|| LookupError::Failed(format!("no PTR record for {ip}")));
            Box::pin(async move { result })
        }
    }

    struct StalledLookup;

    impl ReverseLookup for StalledLookup {
        fn reverse(&self, _ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, LookupError>> {
            Box::pin(futures::future::pending())
        }
    }

    fn resolver(lookup: StaticLookup) -> HostResolver<StaticLookup> {
        HostResolver::new(lookup, Duration::from_millis(500))
    }

    #[test]
    fn test_address_part() {
        assert_eq!(address_part("10.0.0.1:9000"), Some("10.0.0.1"));
        assert_eq!(address_part("10.0.0.1"), Some("10.0.0.1"));
        assert_eq!(address_part("[::1]:80"), Some("::1"));
        assert_eq!(address_part("[2001:db8::7]:443"), Some("2001:db8::7"));
        assert_eq!(address_part("badhost"), None);
        assert_eq!(address_part("unix:/var/run/backend.sock"), None);
        assert_eq!(address_part("a.b.example.com:80"), Some("a.b.example.com"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("host_id_web1.example.com."), "host_id_web1_example_com");
        assert_eq!(sanitize("host_id_a/b\\c:d%e"), "host_id_a_b_c_d_e");
        assert_eq!(sanitize("host_id_x..."), "host_id_x");
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex("badhost"), "222f737ee64382b5dde20a919ab4a34b");
        assert_eq!(md5_hex("0"), "cfcd208495d565ef66e7dff9f98764da");
    }

    #[tokio::test]
    async fn test_resolve_ipv4_peer() {
        let r = resolver(StaticLookup::default().with("10.0.0.1", &["backend1.example.com."]));
        let id = r.resolve(&json!({"server": "10.0.0.1:9000"}), "0").await;
        assert_eq!(id, "host_id_backend1_example_com");
    }

    #[tokio::test]
    async fn test_resolve_joins_multiple_names() {
        let r = resolver(StaticLookup::default().with("10.0.0.1", &["a.example.", "b.example."]));
        let id = r.resolve(&json!({"server": "10.0.0.1:80"}), "0").await;
        assert_eq!(id, "host_id_a_example__b_example");
    }

    #[tokio::test]
    async fn test_resolve_ipv6_peer() {
        let r = resolver(StaticLookup::default().with("::1", &["localhost."]));
        let id = r.resolve(&json!({"server": "[::1]:80"}), "0").await;
        assert_eq!(id, "host_id_localhost");
    }

    #[tokio::test]
    async fn test_unresolvable_peer_is_hashed() {
        let r = resolver(StaticLookup::default());
        let id = r.resolve(&json!({"server": "127.0.0.1:8080"}), "0").await;
        assert_eq!(id, "host_id_5958c386bf5e9109ac10d2a628645aea");

        let id = r.resolve(&json!({"server": "badhost"}), "1").await;
        assert_eq!(id, "host_id_222f737ee64382b5dde20a919ab4a34b");
    }

    #[tokio::test]
    async fn test_missing_server_uses_fallback_label() {
        let r = resolver(StaticLookup::default());
        assert_eq!(
            r.resolve(&json!({"weight": 1}), "0").await,
            "host_id_cfcd208495d565ef66e7dff9f98764da"
        );
        assert_eq!(
            r.resolve(&json!(42), "1").await,
            "host_id_c4ca4238a0b923820dcc509a6f75849b"
        );
        assert_eq!(
            r.resolve(&json!({"server": 8080}), "0").await,
            "host_id_cfcd208495d565ef66e7dff9f98764da"
        );
    }

    #[tokio::test]
    async fn test_distinct_unresolvable_peers_do_not_collide() {
        let r = resolver(StaticLookup::default());
        let a = r.resolve(&json!({"server": "10.0.0.2:9000"}), "0").await;
        let b = r.resolve(&json!({"server": "10.0.0.2:9001"}), "1").await;
        assert_ne!(a, b);
        assert_eq!(a, "host_id_2c7b44c4a2cdc5c9996acc38680e8109");
    }

    #[tokio::test]
    async fn test_stalled_lookup_times_out_to_hash() {
        let r = HostResolver::new(StalledLookup, Duration::from_millis(20));
        let id = r.resolve(&json!({"server": "10.0.0.2:9000"}), "0").await;
        assert_eq!(id, "host_id_2c7b44c4a2cdc5c9996acc38680e8109");
    }
}
