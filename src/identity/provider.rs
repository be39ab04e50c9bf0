use std::sync::Arc;

use tracing::info;

use super::credentials::CredentialStore;
use super::principal::Principal;
use crate::error::{AppError, AppResult};
use crate::model::User;
use crate::storage::RecordStore;

#[derive(Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Hand-written so the password never reaches a log line through `{:?}`.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("username", &self.username).field("password", &"<redacted>").finish()
    }
}

/// Turns credentials into a principal. Session issuing is not its concern.
pub trait AuthProvider<S: RecordStore>: Send + Sync {
    fn authenticate(&self, store: &S, req: &LoginRequest) -> AppResult<Principal>;
}

/// Checks the username/password against user records in the record store.
pub struct LocalAuthProvider {
    credentials: Arc<CredentialStore>,
}

impl LocalAuthProvider {
    pub fn new(credentials: Arc<CredentialStore>) -> Self { Self { credentials } }
}

impl<S: RecordStore> AuthProvider<S> for LocalAuthProvider {
    fn authenticate(&self, store: &S, req: &LoginRequest) -> AppResult<Principal> {
        let wanted = req.username.trim().to_lowercase();
        let user: Option<User> = store.find(|u: &User| u.username.to_lowercase() == wanted)?;
        // Unknown user and wrong password take the same path and the same time.
        let ok = match &user {
            Some(u) => self.credentials.verify(&req.password, &u.password_hash),
            None => self.credentials.verify_dummy(&req.password),
        };
        match user {
            Some(u) if ok => {
                info!(target: "crmdesk::auth", user = %u.username, role = %u.role, "credentials accepted");
                Ok(Principal { user_id: u.id, username: u.username, role: u.role })
            }
            _ => Err(AppError::invalid_credentials()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashParams;
    use crate::identity::Role;
    use crate::storage::SharedStore;

    fn setup() -> (LocalAuthProvider, SharedStore) {
        let cs = Arc::new(CredentialStore::new(HashParams { memory_kib: 64, iterations: 1, parallelism: 1 }).unwrap());
        let mut store = SharedStore::in_memory();
        store.insert(User {
            id: 0,
            username: "Marie".into(),
            first_name: "Marie".into(),
            last_name: "Curie".into(),
            email: "marie@example.com".into(),
            password_hash: cs.hash("radium").unwrap(),
            role: Role::Support,
        }).unwrap();
        (LocalAuthProvider::new(cs), store)
    }

    fn req(u: &str, p: &str) -> LoginRequest { LoginRequest { username: u.into(), password: p.into() } }

    #[test]
    fn good_credentials_yield_principal() {
        let (p, store) = setup();
        let who = p.authenticate(&store, &req("marie", "radium")).unwrap();
        assert_eq!(who.role, Role::Support);
        assert_eq!(who.username, "Marie");
    }

    #[test]
    fn unknown_user_and_bad_password_look_identical() {
        let (p, store) = setup();
        let a = p.authenticate(&store, &req("marie", "polonium")).unwrap_err();
        let b = p.authenticate(&store, &req("pierre", "radium")).unwrap_err();
        assert_eq!(a, b);
        assert!(a.is_authentication());
    }

    #[test]
    fn debug_redacts_password() {
        let s = format!("{:?}", req("marie", "radium"));
        assert!(!s.contains("radium"));
    }
}
