use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::CollectError;

/// Single-attempt HTTP fetch of the nginx status document.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, CollectError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `url` and decode the body as a JSON object.
    ///
    /// Only `200 OK` is accepted. No retries.
    pub async fn fetch(&self, url: &Url) -> Result<Value, CollectError> {
        debug!(%url, "fetching nginx status");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CollectError::RequestFailed { status });
        }

        let body = response.bytes().await?;
        let document: Value =
            serde_json::from_slice(&body).map_err(|e| CollectError::Decode(e.to_string()))?;
        if !document.is_object() {
            return Err(CollectError::Decode(
                "top-level value is not a JSON object".to_string(),
            ));
        }

        Ok(document)
    }
}
