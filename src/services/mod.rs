//! Access-controlled entity services and the `Crm` facade that owns the
//! session manager, the record store and the audit sink.
//!
//! Every entity call runs the same gate, in order:
//! 1. `touch` the caller's session (expired or unknown sessions stop here),
//! 2. load the target and derive its `Ownership` from the store,
//! 3. ask `authorize`; a deny emits `access_denied` and returns before any write,
//! 4. validate input, write through the store,
//! 5. report sensitive transitions to the audit sink (best-effort).

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::audit::{self, AuditEvent, AuditKind, AuditSink, FanoutSink, JsonlFileSink, TracingSink};
use crate::clock::{self, Clock};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{authorize, explain, Action, AuthProvider, CredentialStore, LocalAuthProvider, LoginRequest, Ownership, Principal, ResourceKind, Session, SessionManager};
use crate::model::{NewUser, UserView};
use crate::storage::{RecordStore, SharedStore};

mod users;
mod clients;
mod contracts;
mod events;
pub(crate) mod validate;

pub use users::UserService;
pub use clients::ClientService;
pub use contracts::ContractService;
pub use events::EventService;

pub struct Crm<S: RecordStore> {
    store: S,
    sessions: SessionManager,
    credentials: Arc<CredentialStore>,
    provider: Box<dyn AuthProvider<S>>,
    audit: Box<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl Crm<SharedStore> {
    /// Wire everything from configuration: file-backed store, tracing audit
    /// sink plus the optional JSONL file, system clock.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        cfg.validate()?;
        let store = SharedStore::open(&cfg.data_path)?;
        let credentials = CredentialStore::new(cfg.hash)?;
        let mut sink = FanoutSink::new().with(TracingSink);
        if let Some(p) = &cfg.audit_log_path { sink.push(Box::new(JsonlFileSink::new(p))); }
        Ok(Crm::new(store, credentials, Box::new(sink), clock::system(), cfg.session_timeout()?))
    }
}

impl<S: RecordStore + 'static> Crm<S> {
    pub fn new(store: S, credentials: CredentialStore, audit: Box<dyn AuditSink>, clock: Arc<dyn Clock>, session_timeout: Duration) -> Self {
        let credentials = Arc::new(credentials);
        Self {
            store,
            sessions: SessionManager::new(session_timeout, clock.clone()),
            provider: Box::new(LocalAuthProvider::new(credentials.clone())),
            credentials,
            audit,
            clock,
        }
    }

    /// Swap the credential check (the default looks users up in the store).
    pub fn with_provider(mut self, provider: Box<dyn AuthProvider<S>>) -> Self {
        self.provider = provider;
        self
    }
}

impl<S: RecordStore> Crm<S> {
    pub fn store(&self) -> &S { &self.store }

    pub fn current_session(&self) -> Option<&Session> { self.sessions.current() }

    pub fn session_timeout(&self) -> Duration { self.sessions.timeout() }

    pub fn login(&mut self, username: &str, password: &str) -> AppResult<Session> {
        let req = LoginRequest { username: username.to_string(), password: password.to_string() };
        let principal = match self.provider.authenticate(&self.store, &req) {
            Ok(p) => p,
            Err(e) => {
                if e.is_authentication() {
                    warn!(target: "crmdesk::auth", "login failed");
                    let ev = AuditEvent { kind: AuditKind::LoginFailed, actor_id: None, actor_role: None, payload: json!({ "username": req.username }), timestamp: self.clock.now() };
                    audit::emit(self.audit.as_ref(), ev);
                }
                return Err(e);
            }
        };
        let session = self.sessions.issue(principal)?;
        self.record(AuditKind::LoginSucceeded, &session.principal, json!({ "username": session.username() }));
        Ok(session)
    }

    /// Ends the session. Returns false if the token was not the active one.
    pub fn logout(&mut self, session: &Session) -> bool {
        let was_active = self.sessions.logout(session);
        if was_active {
            self.record(AuditKind::Logout, &session.principal, json!({}));
        }
        was_active
    }

    /// One-time creation of the first management account; fails once any user exists.
    pub fn bootstrap(&mut self, admin: NewUser) -> AppResult<UserView> {
        crate::bootstrap::create_first_manager(&mut self.store, &self.credentials, self.audit.as_ref(), self.clock.as_ref(), admin)
    }

    pub fn users(&mut self) -> UserService<'_, S> { UserService { crm: self } }
    pub fn clients(&mut self) -> ClientService<'_, S> { ClientService { crm: self } }
    pub fn contracts(&mut self) -> ContractService<'_, S> { ContractService { crm: self } }
    pub fn events(&mut self) -> EventService<'_, S> { EventService { crm: self } }

    // ---- shared gate used by the entity services ----

    pub(crate) fn now(&self) -> DateTime<Utc> { self.clock.now() }

    /// Step 1: the session must be alive; refreshes its activity stamp.
    pub(crate) fn begin(&mut self, session: &Session) -> AppResult<Session> {
        let was_active = self.sessions.current().is_some_and(|a| a.token == session.token);
        match self.sessions.touch(session) {
            Ok(s) => Ok(s),
            Err(e) => {
                // audit the transition once, not every later retry with the dead token
                if was_active && e.code_str() == "session_expired" {
                    self.record(AuditKind::SessionExpired, &session.principal, json!({ "last_activity": session.last_activity }));
                }
                Err(e)
            }
        }
    }

    /// Step 3: permission check; denials are audited and never reach the store.
    pub(crate) fn check(&self, actor: &Session, action: Action, resource: ResourceKind, ownership: Ownership, target: Option<u64>) -> AppResult<()> {
        let d = authorize(actor.role(), action, resource, ownership);
        if d.allow { return Ok(()); }
        warn!(target: "crmdesk::authz", user = %actor.username(), "{}", explain(actor.role(), action, resource, ownership));
        self.record(AuditKind::AccessDenied, &actor.principal, json!({
            "action": action.as_str(),
            "resource": resource.as_str(),
            "record_id": target,
            "rule": d.reason,
        }));
        Err(AppError::access_denied())
    }

    pub(crate) fn record(&self, kind: AuditKind, actor: &Principal, payload: JsonValue) {
        let ev = AuditEvent { kind, actor_id: Some(actor.user_id), actor_role: Some(actor.role), payload, timestamp: self.clock.now() };
        audit::emit(self.audit.as_ref(), ev);
    }

    pub(crate) fn hash_password(&self, plaintext: &str) -> AppResult<String> {
        self.credentials.hash(plaintext).map_err(|e| {
            warn!(target: "crmdesk::auth", error = %e, "password hashing failed");
            AppError::store("hash_error", "A technical error occurred. Please try again later.")
        })
    }

    pub(crate) fn log_mutation(&self, actor: &Session, what: &str, id: u64) {
        info!(target: "crmdesk::services", user = %actor.username(), role = %actor.role(), id, "{}", what);
    }
}
