//! Records managed by the services, plus the input shapes callers pass in.
//! Amounts are integer cents. All timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Role;
use crate::storage::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// PHC string; never the plaintext.
    pub password_hash: String,
    pub role: Role,
}

impl Record for User {
    const TABLE: &'static str = "users";
    fn id(&self) -> u64 { self.id }
    fn set_id(&mut self, id: u64) { self.id = id; }
    fn unique_fields(&self) -> Vec<(&'static str, String)> {
        vec![("username", self.username.to_lowercase()), ("email", self.email.to_lowercase())]
    }
}

/// What callers get back for a user: everything except the digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self { id: u.id, username: u.username.clone(), first_name: u.first_name.clone(), last_name: u.last_name.clone(), email: u.email.clone(), role: u.role }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    pub first_contact: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Responsible commercial.
    pub commercial_id: u64,
}

impl Record for Client {
    const TABLE: &'static str = "clients";
    fn id(&self) -> u64 { self.id }
    fn set_id(&mut self, id: u64) { self.id = id; }
    fn unique_fields(&self) -> Vec<(&'static str, String)> { vec![("email", self.email.to_lowercase())] }
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub business_name: Option<String>,
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub business_name: Option<String>,
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    pub id: u64,
    pub client_id: u64,
    /// Stored separately from the client's owner so it can be reassigned.
    pub commercial_id: u64,
    pub total_cents: i64,
    pub rest_to_pay_cents: i64,
    pub created_at: DateTime<Utc>,
    /// Only ever moves false -> true.
    pub signed: bool,
}

impl Record for Contract {
    const TABLE: &'static str = "contracts";
    fn id(&self) -> u64 { self.id }
    fn set_id(&mut self, id: u64) { self.id = id; }
}

#[derive(Debug, Clone, Default)]
pub struct NewContract {
    pub client_id: u64,
    /// Defaults to the client's responsible commercial.
    pub commercial_id: Option<u64>,
    pub total_cents: i64,
    pub rest_to_pay_cents: i64,
    pub signed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContractPatch {
    pub total_cents: Option<i64>,
    pub rest_to_pay_cents: Option<i64>,
    pub signed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: u64,
    pub contract_id: u64,
    pub client_id: u64,
    #[serde(default)]
    pub support_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: u32,
}

impl Record for Event {
    const TABLE: &'static str = "events";
    fn id(&self) -> u64 { self.id }
    fn set_id(&mut self, id: u64) { self.id = id; }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub contract_id: u64,
    pub name: String,
    pub notes: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub attendees: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub attendees: Option<u32>,
}
