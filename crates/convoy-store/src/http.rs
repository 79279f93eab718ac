//! REST record store client.
//!
//! Talks to a collection-based record API:
//!
//! | Operation | Method | Path                                              |
//! |-----------|--------|---------------------------------------------------|
//! | Read      | GET    | `/api/collections/{collection}/records/{id}?expand=…` |
//! | Update    | PATCH  | `/api/collections/{collection}/records/{id}`      |
//!
//! Error responses carry `{"message": "..."}`, which becomes the
//! [`StoreError`] message shown to the user.

use std::time::Duration;

use async_trait::async_trait;
use convoy_core::error::StoreError;
use convoy_core::store::RecordStore;
use serde_json::{Map, Value};
use tracing::debug;

/// HTTP client for one record collection.
pub struct HttpRecordStore {
    http: reqwest::Client,
    /// Base URL (e.g. `http://127.0.0.1:8090`), no trailing slash.
    base_url: String,
    collection: String,
}

impl HttpRecordStore {
    /// Create a client for `collection` under `base_url`.
    pub fn new(base_url: &str, collection: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        })
    }

    fn record_url(&self, record_id: &str) -> String {
        format!(
            "{}/api/collections/{}/records/{}",
            self.base_url,
            self.collection,
            urlencoding::encode(record_id)
        )
    }

    /// Turn a response into the record body or a [`StoreError`].
    async fn into_record(resp: reqwest::Response) -> Result<Value, StoreError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::with_status(format!("failed to read response: {e}"), status.as_u16()))?;

        if !status.is_success() {
            return Err(StoreError::with_status(error_message(&body, status), status.as_u16()));
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreError::with_status(format!("malformed record: {e}"), status.as_u16()))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn read(&self, record_id: &str, expand: &[&str]) -> Result<Value, StoreError> {
        let mut url = self.record_url(record_id);
        if !expand.is_empty() {
            url.push_str("?expand=");
            url.push_str(&urlencoding::encode(&expand.join(",")));
        }
        debug!("[store] GET {url}");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::new(format!("read {record_id} failed: {e}")))?;
        Self::into_record(resp).await
    }

    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<Value, StoreError> {
        let url = self.record_url(record_id);
        debug!("[store] PATCH {url} fields={:?}", fields.keys().collect::<Vec<_>>());

        let resp = self
            .http
            .patch(&url)
            .json(&fields)
            .send()
            .await
            .map_err(|e| StoreError::new(format!("update {record_id} failed: {e}")))?;
        Self::into_record(resp).await
    }
}

/// Human-readable message from an error body, falling back to the status line.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("store returned {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_url_layout() {
        let store = HttpRecordStore::new("http://127.0.0.1:8090/", "movements", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.record_url("mv 1"),
            "http://127.0.0.1:8090/api/collections/movements/records/mv%201"
        );
    }

    #[test]
    fn error_message_prefers_body() {
        let msg = error_message(
            r#"{"code":400,"message":"Failed to update record.","data":{}}"#,
            reqwest::StatusCode::BAD_REQUEST,
        );
        assert_eq!(msg, "Failed to update record.");

        let msg = error_message("<html>bad gateway</html>", reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "store returned 502 Bad Gateway");
    }
}
