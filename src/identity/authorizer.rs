//! Permission table. `authorize` is a pure lookup over (role, action, resource,
//! ownership); it never touches the store and never fails. Anything the table
//! does not list is denied.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::principal::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Change who is responsible for a record (commercial or support contact).
    Assign,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Client,
    Contract,
    Event,
}

impl Action {
    pub const ALL: [Action; 5] = [Action::Create, Action::Read, Action::Update, Action::Delete, Action::Assign];
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Assign => "assign",
        }
    }
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [ResourceKind::User, ResourceKind::Client, ResourceKind::Contract, ResourceKind::Event];
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Client => "client",
            ResourceKind::Contract => "contract",
            ResourceKind::Event => "event",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Structural facts about the target record, computed by the entity service.
///
/// `actor_is_owner` means: for a client, the acting user is its responsible
/// commercial; for a contract (or an event being created on one), the acting
/// user is the responsible commercial of the contract's client; for an event
/// update, the acting user is the assigned support contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub actor_is_owner: bool,
}

impl Ownership {
    pub fn none() -> Self { Self { actor_is_owner: false } }
    pub fn owner() -> Self { Self { actor_is_owner: true } }
    pub fn from_owner_id(actor_id: u64, owner_id: Option<u64>) -> Self {
        Self { actor_is_owner: owner_id == Some(actor_id) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allow: bool,
    pub reason: &'static str,
}

fn allow(reason: &'static str) -> Decision { Decision { allow: true, reason } }
fn deny(reason: &'static str) -> Decision { Decision { allow: false, reason } }

fn owned(o: Ownership, reason: &'static str) -> Decision {
    if o.actor_is_owner { allow(reason) } else { deny("not_owner") }
}

pub fn authorize(role: Role, action: Action, resource: ResourceKind, ownership: Ownership) -> Decision {
    use Action::*;
    use ResourceKind::*;

    // every authenticated role may look at every record
    if action == Read {
        return allow("read_all");
    }
    match (role, resource, action) {
        (Role::Management, User, Create | Update | Delete) => allow("management_users"),
        (Role::Management, Client, Update | Assign) => allow("management_clients"),
        (Role::Management, Contract, Create | Update | Assign) => allow("management_contracts"),
        (Role::Management, Event, Update | Assign) => allow("management_events"),

        (Role::Commercial, Client, Create | Update) => owned(ownership, "commercial_own_client"),
        (Role::Commercial, Contract, Update) => owned(ownership, "commercial_own_client_contract"),
        (Role::Commercial, Event, Create) => owned(ownership, "commercial_own_client_event"),

        (Role::Support, Event, Update) => owned(ownership, "support_assigned_event"),

        _ => deny("default_deny"),
    }
}

pub fn explain(role: Role, action: Action, resource: ResourceKind, ownership: Ownership) -> String {
    let d = authorize(role, action, resource, ownership);
    format!(
        "{} role={} action={} resource={} owner={} rule={}",
        if d.allow { "allow" } else { "deny" }, role, action, resource, ownership.actor_is_owner, d.reason
    )
}

#[cfg(test)]
#[path = "authorizer_tests.rs"]
mod authorizer_tests;
