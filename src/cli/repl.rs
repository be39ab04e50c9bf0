//! Interactive shell over the `Crm` facade. `Repl::execute` does the work and
//! returns printable text; `run` wraps it in a rustyline editor.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use super::command::{parse_line, Args, Command, Entity, HELP};
use super::{render, Tabular};
use crate::error::{AppError, AppResult};
use crate::identity::{Role, Session};
use crate::model::{ClientPatch, ContractPatch, EventPatch, NewClient, NewContract, NewEvent, NewUser, UserPatch};
use crate::services::Crm;
use crate::storage::RecordStore;

pub enum Step {
    Print(String),
    Quit,
}

pub struct Repl<S: RecordStore> {
    crm: Crm<S>,
    session: Option<Session>,
}

fn one<T: Tabular>(record: T) -> String { render(std::slice::from_ref(&record)) }

/// Lines that carry a password never reach the editor history.
fn history_safe(parsed: &AppResult<Option<Command>>, line: &str) -> bool {
    if line.trim().is_empty() || matches!(parsed, Ok(Some(Command::Login { .. }))) {
        return false;
    }
    !line.to_ascii_lowercase().contains("password=")
}

fn unknown_verb(entity: Entity, verb: &str) -> AppError {
    AppError::validation("invalid_input", format!("unknown verb '{} {}'; type 'help'", entity, verb))
}

impl<S: RecordStore> Repl<S> {
    pub fn new(crm: Crm<S>) -> Self { Self { crm, session: None } }

    pub fn crm(&self) -> &Crm<S> { &self.crm }

    pub fn session(&self) -> Option<&Session> { self.session.as_ref() }

    /// Parse and run one line. Errors come back as printable text.
    pub fn handle_line(&mut self, line: &str) -> Step {
        match parse_line(line) {
            Ok(Some(cmd)) => self.execute(cmd),
            Ok(None) => Step::Print(String::new()),
            Err(e) => Step::Print(self.describe(e)),
        }
    }

    pub fn execute(&mut self, cmd: Command) -> Step {
        let out = match cmd {
            Command::Quit => return Step::Quit,
            Command::Help => Ok(HELP.to_string()),
            Command::Login { username, password } => self.login(&username, password.as_deref().unwrap_or("")),
            Command::Logout => Ok(self.logout()),
            Command::WhoAmI => Ok(match &self.session {
                Some(s) => format!("{} ({}, id {})", s.username(), s.role(), s.user_id()),
                None => "not logged in".to_string(),
            }),
            Command::Entity { entity, verb, args } => self.dispatch(entity, &verb, &args),
        };
        Step::Print(out.unwrap_or_else(|e| self.describe(e)))
    }

    fn describe(&mut self, e: AppError) -> String {
        if e.is_session_expired() {
            self.session = None;
        }
        format!("error: {}", e.message())
    }

    fn login(&mut self, username: &str, password: &str) -> AppResult<String> {
        let s = self.crm.login(username, password)?;
        let msg = format!("logged in as {} ({})", s.username(), s.role());
        self.session = Some(s);
        Ok(msg)
    }

    fn logout(&mut self) -> String {
        match self.session.take() {
            Some(s) => {
                self.crm.logout(&s);
                "logged out".to_string()
            }
            None => "not logged in".to_string(),
        }
    }

    fn dispatch(&mut self, entity: Entity, verb: &str, args: &Args) -> AppResult<String> {
        let Some(s) = self.session.clone() else {
            return Err(AppError::session_invalid());
        };
        debug!(target: "crmdesk::cli", entity = %entity, verb, "dispatch");
        match entity {
            Entity::Users => self.users(&s, verb, args),
            Entity::Clients => self.clients(&s, verb, args),
            Entity::Contracts => self.contracts(&s, verb, args),
            Entity::Events => self.events(&s, verb, args),
        }
    }

    fn users(&mut self, s: &Session, verb: &str, a: &Args) -> AppResult<String> {
        let mut svc = self.crm.users();
        match verb {
            "create" => {
                let role: Role = a.require("role")?.parse()?;
                let new = NewUser {
                    username: a.require("username")?,
                    first_name: a.require("first_name")?,
                    last_name: a.require("last_name")?,
                    email: a.require("email")?,
                    password: a.require("password")?,
                    role,
                };
                Ok(one(svc.create(s, new)?))
            }
            "get" => Ok(one(svc.get(s, a.id("id")?)?)),
            "list" => Ok(render(&svc.list(s)?)),
            "update" => {
                let patch = UserPatch {
                    username: a.text("username"),
                    first_name: a.text("first_name"),
                    last_name: a.text("last_name"),
                    email: a.text("email"),
                    role: a.opt_role("role")?,
                    password: a.text("password"),
                };
                Ok(one(svc.update(s, a.id("id")?, patch)?))
            }
            "delete" => {
                let id = a.id("id")?;
                svc.delete(s, id)?;
                Ok(format!("user {} deleted", id))
            }
            other => Err(unknown_verb(Entity::Users, other)),
        }
    }

    fn clients(&mut self, s: &Session, verb: &str, a: &Args) -> AppResult<String> {
        let mut svc = self.crm.clients();
        match verb {
            "create" => {
                let new = NewClient {
                    first_name: a.require("first_name")?,
                    last_name: a.require("last_name")?,
                    email: a.require("email")?,
                    business_name: a.text("business_name"),
                    telephone: a.text("telephone"),
                };
                Ok(one(svc.create(s, new)?))
            }
            "get" => Ok(one(svc.get(s, a.id("id")?)?)),
            "list" => Ok(render(&svc.list(s)?)),
            "mine" => Ok(render(&svc.list_mine(s)?)),
            "update" => {
                let patch = ClientPatch {
                    first_name: a.text("first_name"),
                    last_name: a.text("last_name"),
                    email: a.text("email"),
                    business_name: a.text("business_name"),
                    telephone: a.text("telephone"),
                };
                Ok(one(svc.update(s, a.id("id")?, patch)?))
            }
            "reassign" => Ok(one(svc.reassign(s, a.id("id")?, a.id("commercial")?)?)),
            other => Err(unknown_verb(Entity::Clients, other)),
        }
    }

    fn contracts(&mut self, s: &Session, verb: &str, a: &Args) -> AppResult<String> {
        let mut svc = self.crm.contracts();
        match verb {
            "create" => {
                let total_cents = a.cents("total")?;
                let new = NewContract {
                    client_id: a.id("client")?,
                    commercial_id: a.opt_id("commercial")?,
                    total_cents,
                    rest_to_pay_cents: a.opt_cents("rest")?.unwrap_or(total_cents),
                    signed: a.opt_bool("signed")?.unwrap_or(false),
                };
                Ok(one(svc.create(s, new)?))
            }
            "get" => Ok(one(svc.get(s, a.id("id")?)?)),
            "list" => Ok(render(&svc.list(s)?)),
            "unsigned" => Ok(render(&svc.list_unsigned(s)?)),
            "unpaid" => Ok(render(&svc.list_unpaid(s)?)),
            "update" => {
                let patch = ContractPatch {
                    total_cents: a.opt_cents("total")?,
                    rest_to_pay_cents: a.opt_cents("rest")?,
                    signed: a.opt_bool("signed")?,
                };
                Ok(one(svc.update(s, a.id("id")?, patch)?))
            }
            "reassign" => Ok(one(svc.reassign(s, a.id("id")?, a.id("commercial")?)?)),
            other => Err(unknown_verb(Entity::Contracts, other)),
        }
    }

    fn events(&mut self, s: &Session, verb: &str, a: &Args) -> AppResult<String> {
        let mut svc = self.crm.events();
        match verb {
            "create" => {
                let new = NewEvent {
                    contract_id: a.id("contract")?,
                    name: a.require("name")?,
                    notes: a.text("notes"),
                    start: a.time("start")?,
                    end: a.time("end")?,
                    location: a.text("location"),
                    attendees: a.opt_u32("attendees")?.unwrap_or(0),
                };
                Ok(one(svc.create(s, new)?))
            }
            "get" => Ok(one(svc.get(s, a.id("id")?)?)),
            "list" => Ok(render(&svc.list(s)?)),
            "mine" => Ok(render(&svc.list_mine(s)?)),
            "unassigned" => Ok(render(&svc.list_unassigned(s)?)),
            "update" => {
                let patch = EventPatch {
                    name: a.text("name"),
                    notes: a.text("notes"),
                    start: a.opt_time("start")?,
                    end: a.opt_time("end")?,
                    location: a.text("location"),
                    attendees: a.opt_u32("attendees")?,
                };
                Ok(one(svc.update(s, a.id("id")?, patch)?))
            }
            "assign" => Ok(one(svc.assign_support(s, a.id("id")?, a.id("support")?)?)),
            other => Err(unknown_verb(Entity::Events, other)),
        }
    }

    /// Read-eval-print loop on the terminal until `quit` or end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("crmdesk shell. Type 'help' for commands.");
        loop {
            let prompt = match &self.session {
                Some(s) => format!("{}> ", s.username()),
                None => "> ".to_string(),
            };
            let line = match editor.readline(&prompt) {
                Ok(l) => l,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            let parsed = parse_line(&line);
            if history_safe(&parsed, &line) {
                let _ = editor.add_history_entry(line.as_str());
            }
            let step = match parsed {
                Ok(Some(Command::Login { username, password: None })) => {
                    let password = match rpassword::prompt_password("password: ") {
                        Ok(p) => p,
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                        Err(e) => return Err(e.into()),
                    };
                    self.execute(Command::Login { username, password: Some(password) })
                }
                Ok(Some(cmd)) => self.execute(cmd),
                Ok(None) => continue,
                Err(e) => Step::Print(self.describe(e)),
            };
            match step {
                Step::Quit => break,
                Step::Print(text) => if !text.is_empty() { println!("{}", text) },
            }
        }
        if let Some(s) = self.session.take() {
            self.crm.logout(&s);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::clock::ManualClock;
    use crate::config::HashParams;
    use crate::identity::CredentialStore;
    use crate::storage::SharedStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn repl() -> (Repl<SharedStore>, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let creds = CredentialStore::new(HashParams { memory_kib: 64, iterations: 1, parallelism: 1 }).unwrap();
        let mut crm = Crm::new(SharedStore::in_memory(), creds, Box::new(MemorySink::new()), Arc::new(clock.clone()), Duration::minutes(15));
        crm.bootstrap(NewUser {
            username: "boss".into(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "boss@example.com".into(),
            password: "pw-boss".into(),
            role: Role::Management,
        }).unwrap();
        (Repl::new(crm), clock)
    }

    fn print(step: Step) -> String {
        match step { Step::Print(s) => s, Step::Quit => panic!("unexpected quit") }
    }

    #[test]
    fn entity_commands_need_a_session() {
        let (mut r, _) = repl();
        let out = print(r.handle_line("users list"));
        assert!(out.starts_with("error:"), "{}", out);
    }

    #[test]
    fn login_then_create_and_list() {
        let (mut r, _) = repl();
        assert_eq!(print(r.handle_line("login boss pw-boss")), "logged in as boss (management)");
        let out = print(r.handle_line(r#"users create username=carla first_name=Carla last_name="De Luca" email=carla@example.com password=pw role=commercial"#));
        assert!(out.contains("De Luca"), "{}", out);
        let out = print(r.handle_line("users list"));
        assert!(out.ends_with("rows: 2"), "{}", out);
        assert_eq!(print(r.handle_line("whoami")), "boss (management, id 1)");
    }

    #[test]
    fn bad_login_is_generic() {
        let (mut r, _) = repl();
        let out = print(r.handle_line("login boss wrong"));
        assert_eq!(out, format!("error: {}", crate::error::INVALID_CREDENTIALS_MSG));
        assert!(r.session().is_none());
    }

    #[test]
    fn expiry_clears_the_local_session() {
        let (mut r, clock) = repl();
        print(r.handle_line("login boss pw-boss"));
        clock.advance(Duration::minutes(16));
        let out = print(r.handle_line("clients list"));
        assert!(out.starts_with("error:"), "{}", out);
        assert!(r.session().is_none());
    }

    #[test]
    fn secrets_stay_out_of_history() {
        let check = |line: &str| history_safe(&parse_line(line), line);
        assert!(!check("login boss pw-boss"));
        assert!(!check("login boss"));
        assert!(!check("users create username=carla email=c@x.io password=hunter2 role=commercial"));
        assert!(!check(r#"users update id=2 PASSWORD="new one""#));
        assert!(!check("users update id=2 password=\"unterminated"));
        assert!(!check("   "));
        assert!(check("users list"));
        assert!(check("clients update id=3 email=new@x.io"));
    }

    #[test]
    fn quit_and_unknown_verb() {
        let (mut r, _) = repl();
        print(r.handle_line("login boss pw-boss"));
        assert!(print(r.handle_line("clients explode")).contains("unknown verb"));
        assert!(matches!(r.handle_line("exit"), Step::Quit));
    }
}
