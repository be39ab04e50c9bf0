use super::validate;
use super::Crm;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Ownership, ResourceKind, Role, Session};
use crate::model::{Client, Contract, Event, EventPatch, NewEvent};
use crate::storage::RecordStore;

pub struct EventService<'a, S: RecordStore> {
    pub(super) crm: &'a mut Crm<S>,
}

fn not_found() -> AppError { AppError::validation("event_not_found", "The specified event does not exist.") }

impl<'a, S: RecordStore> EventService<'a, S> {
    fn load(&self, id: u64) -> AppResult<Event> {
        self.crm.store.get::<Event>(id)?.ok_or_else(not_found)
    }

    /// Events hang off a signed contract; the creator must be the responsible
    /// commercial of the contract's client. The event starts without a support contact.
    pub fn create(&mut self, session: &Session, new: NewEvent) -> AppResult<Event> {
        let actor = self.crm.begin(session)?;
        let Some(contract) = self.crm.store.get::<Contract>(new.contract_id)? else {
            return Err(AppError::validation("contract_not_found", "The specified contract does not exist."));
        };
        let client: Option<Client> = self.crm.store.get(contract.client_id)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), client.map(|c| c.commercial_id));
        self.crm.check(&actor, Action::Create, ResourceKind::Event, ownership, None)?;

        if !contract.signed {
            return Err(AppError::validation("contract_not_signed", "Events can only be created for signed contracts."));
        }
        let name = validate::required(&new.name)?;
        validate::schedule(self.crm.now(), new.start, new.end, true)?;
        let event = Event {
            id: 0,
            contract_id: contract.id,
            client_id: contract.client_id,
            support_id: None,
            name,
            notes: validate::optional(new.notes),
            start: new.start,
            end: new.end,
            location: validate::optional(new.location),
            attendees: new.attendees,
        };
        let event = self.crm.store.insert(event)?;
        self.crm.log_mutation(&actor, "event.create", event.id);
        Ok(event)
    }

    pub fn get(&mut self, session: &Session, id: u64) -> AppResult<Event> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Event, Ownership::none(), Some(id))?;
        self.load(id)
    }

    pub fn list(&mut self, session: &Session) -> AppResult<Vec<Event>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Event, Ownership::none(), None)?;
        Ok(self.crm.store.list(|_: &Event| true)?)
    }

    /// Events the acting user is the support contact for.
    pub fn list_mine(&mut self, session: &Session) -> AppResult<Vec<Event>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Event, Ownership::owner(), None)?;
        let me = actor.user_id();
        Ok(self.crm.store.list(|e: &Event| e.support_id == Some(me))?)
    }

    pub fn list_unassigned(&mut self, session: &Session) -> AppResult<Vec<Event>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Event, Ownership::none(), None)?;
        Ok(self.crm.store.list(|e: &Event| e.support_id.is_none())?)
    }

    pub fn update(&mut self, session: &Session, id: u64, patch: EventPatch) -> AppResult<Event> {
        let actor = self.crm.begin(session)?;
        let mut event = self.load(id)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), event.support_id);
        self.crm.check(&actor, Action::Update, ResourceKind::Event, ownership, Some(id))?;

        if let Some(v) = validate::required_opt(patch.name)? { event.name = v; }
        if patch.notes.is_some() { event.notes = validate::optional(patch.notes); }
        if patch.location.is_some() { event.location = validate::optional(patch.location); }
        if let Some(n) = patch.attendees { event.attendees = n; }
        let start_changed = patch.start.is_some_and(|s| s != event.start);
        let start = patch.start.unwrap_or(event.start);
        let end = patch.end.unwrap_or(event.end);
        validate::schedule(self.crm.now(), start, end, start_changed)?;
        event.start = start;
        event.end = end;

        let event = self.crm.store.update(event)?;
        self.crm.log_mutation(&actor, "event.update", event.id);
        Ok(event)
    }

    /// Set (or change) the event's support contact.
    pub fn assign_support(&mut self, session: &Session, id: u64, support_id: u64) -> AppResult<Event> {
        let actor = self.crm.begin(session)?;
        let mut event = self.load(id)?;
        let ownership = Ownership::from_owner_id(actor.user_id(), event.support_id);
        self.crm.check(&actor, Action::Assign, ResourceKind::Event, ownership, Some(id))?;
        validate::contact(&self.crm.store, support_id, Role::Support)?;
        event.support_id = Some(support_id);
        let event = self.crm.store.update(event)?;
        self.crm.log_mutation(&actor, "event.assign_support", event.id);
        Ok(event)
    }
}
