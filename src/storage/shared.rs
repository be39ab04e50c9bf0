use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::{Record, RecordStore, StoreError, StoreResult};

#[derive(Clone, Default, Serialize, Deserialize, Debug)]
struct Table {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    rows: BTreeMap<u64, JsonValue>,
}

#[derive(Clone, Default, Serialize, Deserialize, Debug)]
struct Snapshot {
    #[serde(default)]
    tables: HashMap<String, Table>,
}

/// Cloneable handle; clones share the same tables and snapshot file.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<Snapshot>>,
    path: Option<PathBuf>,
}

impl SharedStore {
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(RwLock::new(Snapshot::default())), path: None }
    }

    /// Open (or start) a store mirrored to `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let snap = if path.exists() {
            let bytes = std::fs::read(&path)?;
            if bytes.iter().all(|b| b.is_ascii_whitespace()) { Snapshot::default() } else { serde_json::from_slice(&bytes)? }
        } else {
            Snapshot::default()
        };
        let rows: usize = snap.tables.values().map(|t| t.rows.len()).sum();
        info!(target: "crmdesk::store", path = %path.display(), rows, "record store opened");
        Ok(Self { inner: Arc::new(RwLock::new(snap)), path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    fn decode<R: Record>(v: &JsonValue) -> StoreResult<R> {
        Ok(serde_json::from_value(v.clone())?)
    }

    fn save(&self, snap: &Snapshot) -> StoreResult<()> {
        let Some(path) = &self.path else { return Ok(()); };
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let bytes = serde_json::to_vec_pretty(snap)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    fn check_unique<R: Record>(table: &Table, candidate: &R) -> StoreResult<()> {
        let wanted = candidate.unique_fields();
        if wanted.is_empty() { return Ok(()); }
        for (id, raw) in table.rows.iter() {
            if *id == candidate.id() { continue; }
            let other: R = Self::decode(raw)?;
            for (field, value) in other.unique_fields() {
                if wanted.iter().any(|(f, v)| *f == field && *v == value) {
                    return Err(StoreError::Conflict { kind: R::TABLE, field: field.to_string() });
                }
            }
        }
        Ok(())
    }

    /// Apply `f` to one table and persist; on any failure the table is restored.
    fn mutate<R: Record, T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Table) -> StoreResult<T>,
    {
        let mut snap = self.inner.write();
        let before = snap.tables.get(R::TABLE).cloned();
        let out = {
            let table = snap.tables.entry(R::TABLE.to_string()).or_default();
            f(table)
        };
        let result = match out {
            Ok(v) => self.save(&snap).map(|_| v),
            Err(e) => Err(e),
        };
        if result.is_err() {
            match before {
                Some(t) => { snap.tables.insert(R::TABLE.to_string(), t); }
                None => { snap.tables.remove(R::TABLE); }
            }
        }
        result
    }
}

impl RecordStore for SharedStore {
    fn find<R: Record, P: Fn(&R) -> bool>(&self, pred: P) -> StoreResult<Option<R>> {
        let snap = self.inner.read();
        let Some(table) = snap.tables.get(R::TABLE) else { return Ok(None); };
        for raw in table.rows.values() {
            let r: R = Self::decode(raw)?;
            if pred(&r) { return Ok(Some(r)); }
        }
        Ok(None)
    }

    fn list<R: Record, P: Fn(&R) -> bool>(&self, pred: P) -> StoreResult<Vec<R>> {
        let snap = self.inner.read();
        let Some(table) = snap.tables.get(R::TABLE) else { return Ok(Vec::new()); };
        let mut out = Vec::new();
        for raw in table.rows.values() {
            let r: R = Self::decode(raw)?;
            if pred(&r) { out.push(r); }
        }
        Ok(out)
    }

    fn get<R: Record>(&self, id: u64) -> StoreResult<Option<R>> {
        let snap = self.inner.read();
        match snap.tables.get(R::TABLE).and_then(|t| t.rows.get(&id)) {
            Some(raw) => Ok(Some(Self::decode(raw)?)),
            None => Ok(None),
        }
    }

    fn insert<R: Record>(&mut self, mut record: R) -> StoreResult<R> {
        let out = self.mutate::<R, _, _>(|table| {
            // ids start at 1 and are never reused
            let id = table.next_id.max(table.rows.keys().next_back().copied().unwrap_or(0)) + 1;
            record.set_id(id);
            Self::check_unique(table, &record)?;
            table.rows.insert(id, serde_json::to_value(&record)?);
            table.next_id = id;
            Ok(record)
        })?;
        debug!(target: "crmdesk::store", table = R::TABLE, id = out.id(), "insert");
        Ok(out)
    }

    fn update<R: Record>(&mut self, record: R) -> StoreResult<R> {
        let out = self.mutate::<R, _, _>(|table| {
            if !table.rows.contains_key(&record.id()) {
                return Err(StoreError::NotFound { kind: R::TABLE, id: record.id() });
            }
            Self::check_unique(table, &record)?;
            table.rows.insert(record.id(), serde_json::to_value(&record)?);
            Ok(record)
        })?;
        debug!(target: "crmdesk::store", table = R::TABLE, id = out.id(), "update");
        Ok(out)
    }

    fn delete<R: Record>(&mut self, id: u64) -> StoreResult<()> {
        self.mutate::<R, _, _>(|table| match table.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { kind: R::TABLE, id }),
        })?;
        debug!(target: "crmdesk::store", table = R::TABLE, id, "delete");
        Ok(())
    }

    fn count<R: Record>(&self) -> StoreResult<usize> {
        Ok(self.inner.read().tables.get(R::TABLE).map(|t| t.rows.len()).unwrap_or(0))
    }
}
