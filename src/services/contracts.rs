use serde_json::json;

use super::validate;
use super::Crm;
use crate::audit::AuditKind;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Ownership, ResourceKind, Role, Session};
use crate::model::{Client, Contract, ContractPatch, NewContract};
use crate::storage::RecordStore;

pub struct ContractService<'a, S: RecordStore> {
    pub(super) crm: &'a mut Crm<S>,
}

fn not_found() -> AppError { AppError::validation("contract_not_found", "The specified contract does not exist.") }

fn already_signed() -> AppError {
    AppError::validation("contract_already_signed", "A signed contract cannot be unsigned.")
}

impl<'a, S: RecordStore> ContractService<'a, S> {
    fn load(&self, id: u64) -> AppResult<Contract> {
        self.crm.store.get::<Contract>(id)?.ok_or_else(not_found)
    }

    /// Ownership of a contract follows its client's responsible commercial.
    fn ownership(&self, actor: &Session, contract: &Contract) -> AppResult<Ownership> {
        let client: Option<Client> = self.crm.store.get(contract.client_id)?;
        Ok(Ownership::from_owner_id(actor.user_id(), client.map(|c| c.commercial_id)))
    }

    fn audit_signed(&self, actor: &Session, contract: &Contract) {
        self.crm.record(AuditKind::ContractSigned, &actor.principal, json!({
            "contract_id": contract.id,
            "client_id": contract.client_id,
            "commercial_id": contract.commercial_id,
        }));
    }

    pub fn create(&mut self, session: &Session, new: NewContract) -> AppResult<Contract> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Create, ResourceKind::Contract, Ownership::none(), None)?;
        validate::amounts(new.total_cents, new.rest_to_pay_cents)?;
        let Some(client) = self.crm.store.get::<Client>(new.client_id)? else {
            return Err(AppError::validation("client_not_found", "The specified client does not exist."));
        };
        let commercial_id = new.commercial_id.unwrap_or(client.commercial_id);
        validate::contact(&self.crm.store, commercial_id, Role::Commercial)?;
        let contract = Contract {
            id: 0,
            client_id: client.id,
            commercial_id,
            total_cents: new.total_cents,
            rest_to_pay_cents: new.rest_to_pay_cents,
            created_at: self.crm.now(),
            signed: new.signed,
        };
        let contract = self.crm.store.insert(contract)?;
        self.crm.log_mutation(&actor, "contract.create", contract.id);
        if contract.signed { self.audit_signed(&actor, &contract); }
        Ok(contract)
    }

    pub fn get(&mut self, session: &Session, id: u64) -> AppResult<Contract> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Contract, Ownership::none(), Some(id))?;
        self.load(id)
    }

    pub fn list(&mut self, session: &Session) -> AppResult<Vec<Contract>> {
        self.list_where(session, |_| true)
    }

    pub fn list_unsigned(&mut self, session: &Session) -> AppResult<Vec<Contract>> {
        self.list_where(session, |c| !c.signed)
    }

    /// Contracts with money still owed.
    pub fn list_unpaid(&mut self, session: &Session) -> AppResult<Vec<Contract>> {
        self.list_where(session, |c| c.rest_to_pay_cents > 0)
    }

    fn list_where<P: Fn(&Contract) -> bool>(&mut self, session: &Session, pred: P) -> AppResult<Vec<Contract>> {
        let actor = self.crm.begin(session)?;
        self.crm.check(&actor, Action::Read, ResourceKind::Contract, Ownership::none(), None)?;
        Ok(self.crm.store.list(pred)?)
    }

    /// Amount changes and signing. `signed` only moves false -> true; asking
    /// for the reverse on a signed contract fails for every role, before the
    /// permission check.
    pub fn update(&mut self, session: &Session, id: u64, patch: ContractPatch) -> AppResult<Contract> {
        let actor = self.crm.begin(session)?;
        let mut contract = self.load(id)?;
        if contract.signed && patch.signed == Some(false) {
            return Err(already_signed());
        }
        let ownership = self.ownership(&actor, &contract)?;
        self.crm.check(&actor, Action::Update, ResourceKind::Contract, ownership, Some(id))?;

        let total = patch.total_cents.unwrap_or(contract.total_cents);
        let rest = patch.rest_to_pay_cents.unwrap_or(contract.rest_to_pay_cents);
        validate::amounts(total, rest)?;
        contract.total_cents = total;
        contract.rest_to_pay_cents = rest;
        let newly_signed = !contract.signed && patch.signed == Some(true);
        if newly_signed { contract.signed = true; }

        let contract = self.crm.store.update(contract)?;
        self.crm.log_mutation(&actor, "contract.update", contract.id);
        if newly_signed { self.audit_signed(&actor, &contract); }
        Ok(contract)
    }

    /// Change the contract's responsible commercial.
    pub fn reassign(&mut self, session: &Session, id: u64, commercial_id: u64) -> AppResult<Contract> {
        let actor = self.crm.begin(session)?;
        let mut contract = self.load(id)?;
        let ownership = self.ownership(&actor, &contract)?;
        self.crm.check(&actor, Action::Assign, ResourceKind::Contract, ownership, Some(id))?;
        validate::contact(&self.crm.store, commercial_id, Role::Commercial)?;
        contract.commercial_id = commercial_id;
        let contract = self.crm.store.update(contract)?;
        self.crm.log_mutation(&actor, "contract.reassign", contract.id);
        Ok(contract)
    }
}
