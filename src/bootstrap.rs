//! First-run setup: the very first account is a management user created
//! without a session. Once any user exists this path is closed.

use serde_json::json;
use tracing::info;

use crate::audit::{self, AuditEvent, AuditKind, AuditSink};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::identity::{CredentialStore, Role};
use crate::model::{NewUser, User, UserView};
use crate::services::validate;
use crate::storage::RecordStore;

pub fn create_first_manager<S: RecordStore>(
    store: &mut S,
    credentials: &CredentialStore,
    sink: &dyn AuditSink,
    clock: &dyn Clock,
    admin: NewUser,
) -> AppResult<UserView> {
    if store.count::<User>()? > 0 {
        return Err(AppError::validation("bootstrap_unavailable", "Users already exist; log in as a management user instead."));
    }
    if admin.role != Role::Management {
        info!(target: "crmdesk::bootstrap", requested = %admin.role, "first account is always management");
    }
    validate::required(&admin.password)?;
    let password_hash = credentials
        .hash(&admin.password)
        .map_err(|_| AppError::store("hash_error", "A technical error occurred. Please try again later."))?;
    let user = User {
        id: 0,
        username: validate::required(&admin.username)?,
        first_name: validate::required(&admin.first_name)?,
        last_name: validate::required(&admin.last_name)?,
        email: validate::email(&admin.email)?,
        password_hash,
        role: Role::Management,
    };
    let user = store.insert(user)?;
    info!(target: "crmdesk::bootstrap", user = %user.username, id = user.id, "created first management user");
    audit::emit(sink, AuditEvent {
        kind: AuditKind::UserCreated,
        actor_id: None,
        actor_role: None,
        payload: json!({ "user_id": user.id, "username": user.username, "role": user.role, "bootstrap": true }),
        timestamp: clock.now(),
    });
    Ok(UserView::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::clock::ManualClock;
    use crate::config::HashParams;
    use crate::storage::SharedStore;
    use chrono::Utc;

    fn admin(role: Role) -> NewUser {
        NewUser {
            username: "root".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "s3cret-pass".into(),
            role,
        }
    }

    fn creds() -> CredentialStore {
        CredentialStore::new(HashParams { memory_kib: 64, iterations: 1, parallelism: 1 }).unwrap()
    }

    #[test]
    fn first_user_is_always_management() {
        let mut store = SharedStore::in_memory();
        let sink = MemorySink::new();
        let clock = ManualClock::new(Utc::now());
        let view = create_first_manager(&mut store, &creds(), &sink, &clock, admin(Role::Support)).unwrap();
        assert_eq!(view.role, Role::Management);
        assert_eq!(sink.kinds(), vec![AuditKind::UserCreated]);
        let ev = &sink.events()[0];
        assert_eq!(ev.actor_id, None);
        assert_eq!(ev.payload["bootstrap"], true);
    }

    #[test]
    fn closed_once_a_user_exists() {
        let mut store = SharedStore::in_memory();
        let sink = MemorySink::new();
        let clock = ManualClock::new(Utc::now());
        let c = creds();
        create_first_manager(&mut store, &c, &sink, &clock, admin(Role::Management)).unwrap();
        let mut second = admin(Role::Management);
        second.username = "other".into();
        second.email = "other@example.com".into();
        let err = create_first_manager(&mut store, &c, &sink, &clock, second).unwrap_err();
        assert_eq!(err.code_str(), "bootstrap_unavailable");
        assert_eq!(store.count::<User>().unwrap(), 1);
    }

    #[test]
    fn blank_password_rejected() {
        let mut store = SharedStore::in_memory();
        let mut a = admin(Role::Management);
        a.password = "   ".into();
        let err = create_first_manager(&mut store, &creds(), &MemorySink::new(), &ManualClock::new(Utc::now()), a).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.count::<User>().unwrap(), 0);
    }
}
