//!
//! crmdesk storage module
//! ----------------------
//! The record-store boundary the access-control core talks to. The core only
//! ever asks for records by predicate or id and hands back whole records to
//! insert, update or delete; it never issues queries of its own, so the
//! backing technology can be swapped without touching the services.
//!
//! `SharedStore` is the bundled implementation: one table per record kind,
//! rows held as JSON values behind an `Arc<RwLock<..>>`, optionally mirrored
//! to a single JSON snapshot file that is rewritten after every mutation.
//! Unique fields declared by a record type are enforced on insert and update
//! and reported as `StoreError::Conflict`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

mod shared;

pub use shared::SharedStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} with the same {field} already exists")]
    Conflict { kind: &'static str, field: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persistable row. Ids are assigned by the store on insert.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Table name, also used as the snapshot key.
    const TABLE: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);

    /// (field name, normalised value) pairs that must be unique within the table.
    fn unique_fields(&self) -> Vec<(&'static str, String)> { Vec::new() }
}

pub trait RecordStore {
    fn find<R: Record, P: Fn(&R) -> bool>(&self, pred: P) -> StoreResult<Option<R>>;
    fn list<R: Record, P: Fn(&R) -> bool>(&self, pred: P) -> StoreResult<Vec<R>>;
    fn insert<R: Record>(&mut self, record: R) -> StoreResult<R>;
    fn update<R: Record>(&mut self, record: R) -> StoreResult<R>;
    fn delete<R: Record>(&mut self, id: u64) -> StoreResult<()>;

    fn get<R: Record>(&self, id: u64) -> StoreResult<Option<R>> {
        self.find(|r: &R| r.id() == id)
    }

    fn count<R: Record>(&self) -> StoreResult<usize> {
        Ok(self.list(|_: &R| true)?.len())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
