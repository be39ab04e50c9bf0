use super::validate;
use super::Crm;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Ownership, ResourceKind, Role, Session};
use crate::model::{Client, ClientPatch, NewClient};
use crate::storage::RecordStore;

pub struct ClientService<'a, S: RecordStore> {
    pub(super) crm: &'a mut Crm<S>,
}

fn not_found() -> AppError { AppError::validation("client_not_found", "The specified client does not exist.") }

impl<'a, S: RecordStore> ClientService<'a, S> {
    fn load(&self, id: u64) -> AppResult<Client> {
        self.crm.store.get::<Client>(id)?.ok_or_else(not_found)
    }

    /// The acting user becomes the client's responsible commercial.
    pub fn create(&mut self, session: &Session, new: NewClient) -> AppResult<Client> {
        let actor = self.crm.begin(session)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), Some(actor.user_id()));
        self.crm.check(&actor, Action::Create, ResourceKind::Client, ownership, None)?;
        let now = self.crm.now();
        let client = Client {
            id: 0,
            first_name: validate::required(&new.first_name)?,
            last_name: validate::required(&new.last_name)?,
            email: validate::email(&new.email)?,
            business_name: validate::optional(new.business_name),
            telephone: validate::optional(new.telephone),
            first_contact: now,
            last_update: now,
            commercial_id: actor.user_id(),
        };
        let client = self.crm.store.insert(client)?;
        self.crm.log_mutation(&actor, "client.create", client.id);
        Ok(client)
    }

    pub fn get(&mut self, session: &Session, id: u64) -> AppResult<Client> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Client, Ownership::none(), Some(id))?;
        self.load(id)
    }

    pub fn list(&mut self, session: &Session) -> AppResult<Vec<Client>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Client, Ownership::none(), None)?;
        Ok(self.crm.store.list(|_: &Client| true)?)
    }

    /// Clients the acting user is responsible for.
    pub fn list_mine(&mut self, session: &Session) -> AppResult<Vec<Client>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Client, Ownership::owner(), None)?;
        let me = actor.user_id();
        Ok(self.crm.store.list(|c: &Client| c.commercial_id == me)?)
    }

    pub fn update(&mut self, session: &Session, id: u64, patch: ClientPatch) -> AppResult<Client> {
        let actor = self.crm.begin(session)?;
        let mut client = self.load(id)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), Some(client.commercial_id));
        self.crm.check(&actor, Action::Update, ResourceKind::Client, ownership, Some(id))?;

        if let Some(v) = validate::required_opt(patch.first_name)? { client.first_name = v; }
        if let Some(v) = validate::required_opt(patch.last_name)? { client.last_name = v; }
        if let Some(v) = patch.email { client.email = validate::email(&v)?; }
        if patch.business_name.is_some() { client.business_name = validate::optional(patch.business_name); }
        if patch.telephone.is_some() { client.telephone = validate::optional(patch.telephone); }
        client.last_update = self.crm.now();

        let client = self.crm.store.update(client)?;
        self.crm.log_mutation(&actor, "client.update", client.id);
        Ok(client)
    }

    /// Hand the client to another commercial.
    pub fn reassign(&mut self, session: &Session, id: u64, commercial_id: u64) -> AppResult<Client> {
        let actor = self.crm.begin(session)?;
        let mut client = self.load(id)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), Some(client.commercial_id));
        self.crm.check(&actor, Action::Assign, ResourceKind::Client, ownership, Some(id))?;
        validate::contact(&self.crm.store, commercial_id, Role::Commercial)?;
        client.commercial_id = commercial_id;
        client.last_update = self.crm.now();
        let client = self.crm.store.update(client)?;
        self.crm.log_mutation(&actor, "client.reassign", client.id);
        Ok(client)
    }
}
