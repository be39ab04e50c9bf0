//! Security/audit event sinks. Delivery is best-effort: a failing sink is
//! logged and otherwise ignored, never allowed to undo or block the operation
//! that produced the event.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::identity::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    LoginSucceeded,
    LoginFailed,
    Logout,
    SessionExpired,
    AccessDenied,
    UserCreated,
    UserUpdated,
    UserRoleChanged,
    UserDeleted,
    ContractSigned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub kind: AuditKind,
    /// None when nobody is authenticated (failed login, bootstrap).
    pub actor_id: Option<u64>,
    pub actor_role: Option<Role>,
    pub payload: JsonValue,
    pub timestamp: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn notify(&self, ev: &AuditEvent) -> Result<()>;
}

/// Emits each event as a structured `tracing` record under `crmdesk::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn notify(&self, ev: &AuditEvent) -> Result<()> {
        let payload = ev.payload.to_string();
        match ev.kind {
            AuditKind::LoginFailed | AuditKind::AccessDenied | AuditKind::SessionExpired => {
                tracing::warn!(target: "crmdesk::audit", kind = ?ev.kind, actor = ?ev.actor_id, role = ?ev.actor_role, %payload, "security event");
            }
            _ => {
                tracing::info!(target: "crmdesk::audit", kind = ?ev.kind, actor = ?ev.actor_id, role = ?ev.actor_role, %payload, "audit event");
            }
        }
        Ok(())
    }
}

/// Appends one compact JSON object per line.
pub struct JsonlFileSink { path: PathBuf }

impl JsonlFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self { Self { path: path.as_ref().to_path_buf() } }
}

impl AuditSink for JsonlFileSink {
    fn notify(&self, ev: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(ev)?;
        let mut f = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(&mut f, "{}", line)?;
        Ok(())
    }
}

/// Keeps events in memory; clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink { events: Arc<Mutex<Vec<AuditEvent>>> }

impl MemorySink {
    pub fn new() -> Self { Self::default() }
    pub fn events(&self) -> Vec<AuditEvent> { self.events.lock().clone() }
    pub fn kinds(&self) -> Vec<AuditKind> { self.events.lock().iter().map(|e| e.kind).collect() }
    pub fn clear(&self) { self.events.lock().clear(); }
}

impl AuditSink for MemorySink {
    fn notify(&self, ev: &AuditEvent) -> Result<()> {
        self.events.lock().push(ev.clone());
        Ok(())
    }
}

/// Delivers to every inner sink; reports the first failure after trying all.
#[derive(Default)]
pub struct FanoutSink { sinks: Vec<Box<dyn AuditSink>> }

impl FanoutSink {
    pub fn new() -> Self { Self::default() }
    pub fn with(mut self, sink: impl AuditSink + 'static) -> Self { self.sinks.push(Box::new(sink)); self }
    pub fn push(&mut self, sink: Box<dyn AuditSink>) { self.sinks.push(sink); }
    pub fn len(&self) -> usize { self.sinks.len() }
    pub fn is_empty(&self) -> bool { self.sinks.is_empty() }
}

impl AuditSink for FanoutSink {
    fn notify(&self, ev: &AuditEvent) -> Result<()> {
        let mut first_err = None;
        for s in self.sinks.iter() {
            if let Err(e) = s.notify(ev) { first_err.get_or_insert(e); }
        }
        match first_err { Some(e) => Err(e), None => Ok(()) }
    }
}

/// Fire-and-forget delivery used by the services.
pub fn emit(sink: &dyn AuditSink, ev: AuditEvent) {
    if let Err(e) = sink.notify(&ev) {
        tracing::warn!(target: "crmdesk::audit", kind = ?ev.kind, error = %e, "audit sink delivery failed");
    }
}
