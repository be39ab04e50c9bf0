//! Line parsing for the interactive shell. Pure: no I/O, no access to the
//! services, so it can be tested on its own.
//!
//! Grammar:
//!   login <username> [password]
//!   logout | whoami | help | quit | exit
//!   <users|clients|contracts|events> <verb> [key=value ...]
//! Values may be double-quoted to include spaces: `name="Summer party"`.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{AppError, AppResult};
use crate::identity::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity { Users, Clients, Contracts, Events }

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Clients => "clients",
            Entity::Contracts => "contracts",
            Entity::Events => "events",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "users" | "user" => Some(Entity::Users),
            "clients" | "client" => Some(Entity::Clients),
            "contracts" | "contract" => Some(Entity::Contracts),
            "events" | "event" => Some(Entity::Events),
            _ => None,
        }
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: Option<String> },
    Logout,
    WhoAmI,
    Help,
    Quit,
    Entity { entity: Entity, verb: String, args: Args },
}

/// `key=value` arguments of an entity command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(BTreeMap<String, String>);

fn bad_input(msg: impl Into<String>) -> AppError { AppError::validation("invalid_input", msg) }

impl Args {
    pub fn insert(&mut self, key: &str, value: &str) { self.0.insert(key.to_ascii_lowercase(), value.to_string()); }

    pub fn text(&self, key: &str) -> Option<String> { self.0.get(key).cloned() }

    pub fn require(&self, key: &str) -> AppResult<String> {
        self.text(key).ok_or_else(|| bad_input(format!("missing argument '{}'", key)))
    }

    pub fn id(&self, key: &str) -> AppResult<u64> {
        let raw = self.require(key)?;
        raw.parse::<u64>().map_err(|_| bad_input(format!("'{}' must be a numeric id", key)))
    }

    pub fn opt_id(&self, key: &str) -> AppResult<Option<u64>> {
        match self.0.get(key) { Some(_) => self.id(key).map(Some), None => Ok(None) }
    }

    pub fn opt_u32(&self, key: &str) -> AppResult<Option<u32>> {
        self.0.get(key)
            .map(|v| v.parse::<u32>().map_err(|_| bad_input(format!("'{}' must be a whole number", key))))
            .transpose()
    }

    pub fn opt_bool(&self, key: &str) -> AppResult<Option<bool>> {
        self.0.get(key)
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(bad_input(format!("'{}' must be true or false", key))),
            })
            .transpose()
    }

    pub fn opt_cents(&self, key: &str) -> AppResult<Option<i64>> {
        self.0.get(key).map(|v| parse_cents(v).ok_or_else(|| bad_input(format!("'{}' must be an amount like 1500 or 1500.50", key)))).transpose()
    }

    pub fn cents(&self, key: &str) -> AppResult<i64> {
        self.opt_cents(key)?.ok_or_else(|| bad_input(format!("missing argument '{}'", key)))
    }

    pub fn opt_time(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        self.0.get(key).map(|v| parse_time(v).ok_or_else(|| bad_input(format!("'{}' must be a date like 2026-06-04 13:00", key)))).transpose()
    }

    pub fn time(&self, key: &str) -> AppResult<DateTime<Utc>> {
        self.opt_time(key)?.ok_or_else(|| bad_input(format!("missing argument '{}'", key)))
    }

    pub fn opt_role(&self, key: &str) -> AppResult<Option<Role>> {
        self.0.get(key).map(|v| v.parse::<Role>()).transpose()
    }
}

/// Decimal amount to integer cents. Accepts at most two fractional digits.
pub fn parse_cents(s: &str) -> Option<i64> {
    let s = s.trim();
    let (neg, digits) = match s.strip_prefix('-') { Some(r) => (true, r), None => (false, s) };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = if frac.is_empty() { 0 } else { format!("{:0<2}", frac).parse().ok()? };
    let cents = whole.checked_mul(100)?.checked_add(frac)?;
    Some(if neg { -cents } else { cents })
}

/// RFC 3339, or a naive `YYYY-MM-DD[ HH:MM[:SS]]` taken as UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) { return Some(t.with_timezone(&Utc)); }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) { return Some(Utc.from_utc_datetime(&t)); }
    }
    let d = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?))
}

/// Whitespace split that keeps double-quoted runs together and strips the quotes.
fn tokenize(line: &str) -> AppResult<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut started = false;
    for ch in line.chars() {
        match ch {
            '"' => { in_quotes = !in_quotes; started = true; }
            c if c.is_whitespace() && !in_quotes => {
                if started { out.push(std::mem::take(&mut cur)); started = false; }
            }
            c => { cur.push(c); started = true; }
        }
    }
    if in_quotes { return Err(bad_input("unterminated quote")); }
    if started { out.push(cur); }
    Ok(out)
}

/// Returns Ok(None) for a blank line.
pub fn parse_line(line: &str) -> AppResult<Option<Command>> {
    let tokens = tokenize(line)?;
    let Some((head, rest)) = tokens.split_first() else { return Ok(None) };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        "logout" => Command::Logout,
        "whoami" => Command::WhoAmI,
        "login" => match rest {
            [u] => Command::Login { username: u.clone(), password: None },
            [u, p] => Command::Login { username: u.clone(), password: Some(p.clone()) },
            _ => return Err(bad_input("usage: login <username> [password]")),
        },
        other => {
            let Some(entity) = Entity::parse(other) else {
                return Err(bad_input(format!("unknown command '{}'; type 'help'", other)));
            };
            let Some((verb, pairs)) = rest.split_first() else {
                return Err(bad_input(format!("usage: {} <verb> [key=value ...]", entity)));
            };
            let mut args = Args::default();
            for p in pairs {
                let Some((k, v)) = p.split_once('=') else {
                    return Err(bad_input(format!("expected key=value, got '{}'", p)));
                };
                args.insert(k.trim(), v);
            }
            Command::Entity { entity, verb: verb.to_ascii_lowercase(), args }
        }
    };
    Ok(Some(cmd))
}

pub const HELP: &str = "\
Commands:
  login <username> [password]      start a session (password is prompted if omitted)
  logout                           end the session
  whoami                           show the logged-in user
  help                             show this help
  quit | exit                      leave the shell

  users create username= first_name= last_name= email= password= role=management|commercial|support
  users get id=  |  users list  |  users delete id=
  users update id= [username= first_name= last_name= email= password= role=]

  clients create first_name= last_name= email= [business_name= telephone=]
  clients get id=  |  clients list  |  clients mine
  clients update id= [first_name= last_name= email= business_name= telephone=]
  clients reassign id= commercial=

  contracts create client= total= [rest= signed=true|false commercial=]
  contracts get id=  |  contracts list  |  contracts unsigned  |  contracts unpaid
  contracts update id= [total= rest= signed=true]
  contracts reassign id= commercial=

  events create contract= name= start= end= [notes= location= attendees=]
  events get id=  |  events list  |  events mine  |  events unassigned
  events update id= [name= notes= location= attendees= start= end=]
  events assign id= support=

Amounts are decimal (1500.50). Dates are YYYY-MM-DD HH:MM in UTC, quoted when they contain a space.";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_entity_command_with_quoted_values() {
        let cmd = parse_line(r#"events create contract=3 name="Summer party" start="2026-06-04 13:00""#).unwrap().unwrap();
        let Command::Entity { entity, verb, args } = cmd else { panic!("expected entity command") };
        assert_eq!(entity, Entity::Events);
        assert_eq!(verb, "create");
        assert_eq!(args.id("contract").unwrap(), 3);
        assert_eq!(args.text("name").as_deref(), Some("Summer party"));
        let t = args.time("start").unwrap();
        assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2026, 6, 4, 13));
    }

    #[test]
    fn blank_and_builtin_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("QUIT").unwrap(), Some(Command::Quit));
        assert_eq!(parse_line("login ana").unwrap(), Some(Command::Login { username: "ana".into(), password: None }));
        assert!(parse_line("login").is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("clients").is_err());
        assert!(parse_line("clients update id").is_err());
        assert!(parse_line(r#"clients update id=1 first_name="oops"#).is_err());
    }

    #[test]
    fn cents_parsing() {
        assert_eq!(parse_cents("1500"), Some(150_000));
        assert_eq!(parse_cents("1500.5"), Some(150_050));
        assert_eq!(parse_cents("0.05"), Some(5));
        assert_eq!(parse_cents("-3"), Some(-300));
        for bad in ["", "1.234", "abc", ".5", "1,5"] {
            assert_eq!(parse_cents(bad), None, "{:?}", bad);
        }
    }

    #[test]
    fn typed_argument_errors_are_validation() {
        let Some(Command::Entity { args, .. }) = parse_line("contracts update id=x signed=maybe").unwrap() else { panic!() };
        assert_eq!(args.id("id").unwrap_err().code_str(), "invalid_input");
        assert!(args.opt_bool("signed").is_err());
        assert_eq!(args.opt_bool("missing").unwrap(), None);
        assert_eq!(args.require("nope").unwrap_err().code_str(), "invalid_input");
    }
}
