//! Record store contract.
//!
//! The tracking subsystem only needs partial updates and reads with relation
//! expansion against one collection of movement records. The concrete store
//! (HTTP or in-memory) lives in `convoy-store`.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Key-value record update contract.
///
/// Implementations must be safe to share between the tracking worker and any
/// number of concurrent viewers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read one record, expanding the named relations inline under `expand`.
    async fn read(&self, record_id: &str, expand: &[&str]) -> Result<Value, StoreError>;

    /// Merge `fields` into the record and return the updated record.
    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<Value, StoreError>;
}
