//! Storage collaborator interfaces.
//!
//! The service consumes two durable stores, specified only at this boundary:
//! a record store keyed by test run id (idempotent insert, patch by key) and
//! a blob store (write bytes under a generated key). Both signal failure
//! distinctly from success and are assumed durable once acknowledged.
//!
//! The in-memory implementations back local runs and tests; production
//! deployments supply their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors signalled by the storage collaborators.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// The record store rejected an operation.
    #[error("record store failed for `{key}`: {reason}")]
    Record {
        /// The record key the operation targeted.
        key: String,
        /// Collaborator-supplied failure description.
        reason: String,
    },

    /// The blob store rejected a write.
    #[error("blob store failed for `{key}`: {reason}")]
    Blob {
        /// The object key the write targeted.
        key: String,
        /// Collaborator-supplied failure description.
        reason: String,
    },
}

/// One test run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRecord {
    /// Unique identifier of the test run.
    pub test_result_id: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 completion timestamp, set once results arrive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Key/record store for test runs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a run record. Idempotent: re-inserting the same key is not an
    /// error.
    async fn insert_run(&self, record: TestRunRecord) -> Result<(), StorageError>;

    /// Patches the record under `run_id` with a completion timestamp.
    async fn mark_completed(&self, run_id: &str, completed_at: &str) -> Result<(), StorageError>;
}

/// Object store for raw result payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `body` under `key`, overwriting any previous object.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError>;
}

/// Record store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, TestRunRecord>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored record for `run_id`, if any.
    pub fn get(&self, run_id: &str) -> Option<TestRunRecord> {
        self.records.lock().expect("record map poisoned").get(run_id).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().expect("record map poisoned").len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_run(&self, record: TestRunRecord) -> Result<(), StorageError> {
        self.records
            .lock()
            .expect("record map poisoned")
            .insert(record.test_result_id.clone(), record);
        Ok(())
    }

    async fn mark_completed(&self, run_id: &str, completed_at: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().expect("record map poisoned");
        match records.get_mut(run_id) {
            Some(record) => {
                record.completed_at = Some(completed_at.to_string());
                Ok(())
            }
            None => Err(StorageError::Record {
                key: run_id.to_string(),
                reason: "no such record".to_string(),
            }),
        }
    }
}

/// Blob store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored bytes under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("object map poisoned").get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("object map poisoned")
            .insert(key.to_string(), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TestRunRecord {
        TestRunRecord {
            test_result_id: id.to_string(),
            created_at: "2026-08-24T00:00:00+00:00".to_string(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let store = InMemoryRecordStore::new();
        store.insert_run(record("run-1")).await.unwrap();
        store.insert_run(record("run-1")).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn mark_completed_patches_an_existing_record() {
        let store = InMemoryRecordStore::new();
        store.insert_run(record("run-1")).await.unwrap();

        store
            .mark_completed("run-1", "2026-08-24T01:00:00+00:00")
            .await
            .unwrap();

        let stored = store.get("run-1").unwrap();
        assert_eq!(
            stored.completed_at.as_deref(),
            Some("2026-08-24T01:00:00+00:00")
        );
        assert_eq!(stored.created_at, "2026-08-24T00:00:00+00:00");
    }

    #[tokio::test]
    async fn mark_completed_on_a_missing_record_fails_distinctly() {
        let store = InMemoryRecordStore::new();
        let error = store
            .mark_completed("missing", "2026-08-24T01:00:00+00:00")
            .await
            .unwrap_err();
        assert!(matches!(error, StorageError::Record { .. }));
    }

    #[tokio::test]
    async fn blob_writes_overwrite() {
        let store = InMemoryBlobStore::new();
        store.put_object("k", b"one".to_vec()).await.unwrap();
        store.put_object("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
    }

    #[test]
    fn record_serialises_in_camel_case() {
        let json = serde_json::to_string(&record("run-1")).unwrap();
        assert!(json.contains("testResultId"));
        assert!(json.contains("createdAt"));
        assert!(!json.contains("completedAt"), "absent field is skipped");
    }
}
