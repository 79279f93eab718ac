//! In-process record store.
//!
//! Holds records of every collection in one map keyed by record id and keeps
//! a log of every successful update. Used for dry runs and as the store fake
//! in tracking tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use async_trait::async_trait;
use convoy_core::error::StoreError;
use convoy_core::store::RecordStore;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// In-memory [`RecordStore`].
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<AHashMap<String, Value>>,
    /// Successful updates in arrival order.
    updates: Mutex<Vec<(String, Map<String, Value>)>>,
    /// Number of upcoming writes to fail.
    fail_writes: AtomicUsize,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record before the store is shared.
    pub fn with_record(mut self, id: &str, record: Value) -> Self {
        self.records.get_mut().insert(id.to_string(), record);
        self
    }

    /// Insert or replace a record.
    pub async fn insert(&self, id: &str, record: Value) {
        self.records.lock().await.insert(id.to_string(), record);
    }

    /// Fail the next `n` updates with a store error.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Snapshot of the update log.
    pub async fn updates(&self) -> Vec<(String, Map<String, Value>)> {
        self.updates.lock().await.clone()
    }

    /// Current state of a record.
    pub async fn record(&self, id: &str) -> Option<Value> {
        self.records.lock().await.get(id).cloned()
    }

    /// Number of reads served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, record_id: &str, expand: &[&str]) -> Result<Value, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;
        let mut record = records
            .get(record_id)
            .cloned()
            .ok_or_else(|| StoreError::with_status(format!("record {record_id} not found"), 404))?;

        let mut expanded = Map::new();
        for relation in expand {
            let related = record
                .get(*relation)
                .and_then(Value::as_str)
                .and_then(|rid| records.get(rid))
                .cloned();
            if let Some(related) = related {
                expanded.insert(relation.to_string(), related);
            }
        }
        if !expanded.is_empty() {
            if let Value::Object(obj) = &mut record {
                obj.insert("expand".to_string(), Value::Object(expanded));
            }
        }
        Ok(record)
    }

    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<Value, StoreError> {
        if self.take_failure() {
            return Err(StoreError::with_status("Failed to update record.", 400));
        }

        let mut records = self.records.lock().await;
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::with_status(format!("record {record_id} not found"), 404))?;
        let Value::Object(obj) = &mut *record else {
            return Err(StoreError::new(format!("record {record_id} is not an object")));
        };
        for (k, v) in &fields {
            obj.insert(k.clone(), v.clone());
        }
        let updated = record.clone();
        drop(records);

        self.updates.lock().await.push((record_id.to_string(), fields));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_record("mv1", json!({"id": "mv1", "status": "Not Started", "order": "ord1"}))
            .with_record("ord1", json!({"id": "ord1", "startLocation": "Port X"}))
    }

    #[tokio::test]
    async fn read_expands_relations() {
        let s = store();
        let plain = s.read("mv1", &[]).await.unwrap();
        assert!(plain.get("expand").is_none());

        let rec = s.read("mv1", &["order"]).await.unwrap();
        assert_eq!(rec["expand"]["order"]["startLocation"], "Port X");
        assert_eq!(s.read_count(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_logs() {
        let s = store();
        let mut fields = Map::new();
        fields.insert("status".into(), json!("In Transit"));
        let rec = s.update("mv1", fields).await.unwrap();
        assert_eq!(rec["status"], "In Transit");
        assert_eq!(rec["order"], "ord1");
        assert_eq!(s.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let s = store();
        s.fail_next_writes(1);
        assert!(s.update("mv1", Map::new()).await.is_err());
        assert!(s.update("mv1", Map::new()).await.is_ok());
        assert_eq!(s.updates().await.len(), 1);

        let err = s.update("missing", Map::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
