use serde_json::json;

use super::validate;
use super::Crm;
use crate::audit::AuditKind;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Ownership, ResourceKind, Session};
use crate::model::{NewUser, User, UserPatch, UserView};
use crate::storage::RecordStore;

pub struct UserService<'a, S: RecordStore> {
    pub(super) crm: &'a mut Crm<S>,
}

fn not_found() -> AppError { AppError::validation("user_not_found", "The specified user does not exist.") }

impl<'a, S: RecordStore> UserService<'a, S> {
    fn load(&self, id: u64) -> AppResult<User> {
        self.crm.store.get::<User>(id)?.ok_or_else(not_found)
    }

    pub fn create(&mut self, session: &Session, new: NewUser) -> AppResult<UserView> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Create, ResourceKind::User, Ownership::none(), None)?;
        let user = User {
            id: 0,
            username: validate::required(&new.username)?,
            first_name: validate::required(&new.first_name)?,
            last_name: validate::required(&new.last_name)?,
            email: validate::email(&new.email)?,
            password_hash: {
                validate::required(&new.password)?;
                self.crm.hash_password(&new.password)?
            },
            role: new.role,
        };
        let user = self.crm.store.insert(user)?;
        self.crm.log_mutation(&actor, "user.create", user.id);
        self.crm.record(AuditKind::UserCreated, &actor.principal, json!({
            "user_id": user.id,
            "username": user.username,
            "role": user.role,
        }));
        Ok(UserView::from(&user))
    }

    pub fn get(&mut self, session: &Session, id: u64) -> AppResult<UserView> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::User, Ownership::none(), Some(id))?;
        Ok(UserView::from(&self.load(id)?))
    }

    pub fn list(&mut self, session: &Session) -> AppResult<Vec<UserView>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::User, Ownership::none(), None)?;
        let users: Vec<User> = self.crm.store.list(|_: &User| true)?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// Only provided fields change. A role change is audited on its own.
    pub fn update(&mut self, session: &Session, id: u64, patch: UserPatch) -> AppResult<UserView> {
        let actor = self.crm.begin(session)?;
        let mut user = self.load(id)?;
        self.crm.check(&actor, Action::Update, ResourceKind::User, Ownership::none(), Some(id))?;

        let mut changed: Vec<&'static str> = Vec::new();
        if let Some(v) = validate::required_opt(patch.username)? { if v != user.username { user.username = v; changed.push("username"); } }
        if let Some(v) = validate::required_opt(patch.first_name)? { if v != user.first_name { user.first_name = v; changed.push("first_name"); } }
        if let Some(v) = validate::required_opt(patch.last_name)? { if v != user.last_name { user.last_name = v; changed.push("last_name"); } }
        if let Some(v) = patch.email { let v = validate::email(&v)?; if v != user.email { user.email = v; changed.push("email"); } }
        if let Some(p) = patch.password {
            validate::required(&p)?;
            user.password_hash = self.crm.hash_password(&p)?;
            changed.push("password");
        }
        let old_role = user.role;
        if let Some(r) = patch.role { user.role = r; }

        let user = self.crm.store.update(user)?;
        self.crm.log_mutation(&actor, "user.update", user.id);
        if user.role != old_role {
            self.crm.record(AuditKind::UserRoleChanged, &actor.principal, json!({
                "user_id": user.id,
                "from": old_role,
                "to": user.role,
            }));
        }
        if !changed.is_empty() {
            self.crm.record(AuditKind::UserUpdated, &actor.principal, json!({ "user_id": user.id, "fields": changed }));
        }
        Ok(UserView::from(&user))
    }

    /// Removes the user record only; references held by clients, contracts
    /// and events are left as they are.
    pub fn delete(&mut self, session: &Session, id: u64) -> AppResult<()> {
        let actor = self.crm.begin(session)?;
        let user = self.load(id)?;
        self.crm.check(&actor, Action::Delete, ResourceKind::User, Ownership::none(), Some(id))?;
        self.crm.store.delete::<User>(id)?;
        self.crm.log_mutation(&actor, "user.delete", id);
        self.crm.record(AuditKind::UserDeleted, &actor.principal, json!({ "user_id": id, "username": user.username }));
        Ok(())
    }
}
