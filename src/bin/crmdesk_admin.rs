//!
//! crmdesk_admin
//! -------------
//! Creates the first management account on an empty data file. Refuses to run
//! once any user exists; further accounts are created from the shell by a
//! management user.

use std::env;

use tracing_subscriber::{fmt, EnvFilter};

use crmdesk::config::{AppConfig, DEFAULT_LOG_FILTER};
use crmdesk::identity::Role;
use crmdesk::model::NewUser;
use crmdesk::services::Crm;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --username <u> --email <e> [--password <p>] [--first-name <f>] [--last-name <l>]\n\nFlags:\n  --username <u>      Login name of the management account\n  --email <e>         Contact email\n  --password <p>      Password (prompted when omitted)\n  --first-name <f>    Defaults to 'Admin'\n  --last-name <l>     Defaults to the username\n  -h, --help          Show this help\n\nEnvironment:\n  CRMDESK_CONFIG, CRMDESK_DATA, CRMDESK_AUDIT_LOG select the data and audit files."
    );
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "crmdesk_admin".to_string() } else { args.remove(0) };

    let mut username: Option<String> = None;
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut first_name: Option<String> = None;
    let mut last_name: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let slot = match flag {
            "-h" | "--help" => { print_usage(&program); return; }
            "--username" => &mut username,
            "--email" => &mut email,
            "--password" => &mut password,
            "--first-name" => &mut first_name,
            "--last-name" => &mut last_name,
            other => { eprintln!("unknown argument: {}", other); print_usage(&program); std::process::exit(2); }
        };
        if i + 1 >= args.len() { eprintln!("{} requires a value", flag); print_usage(&program); std::process::exit(2); }
        *slot = Some(args[i + 1].clone());
        i += 2;
    }

    let (Some(username), Some(email)) = (username, email) else {
        print_usage(&program);
        std::process::exit(2);
    };
    let password = match password {
        Some(p) => p,
        None => match prompt_password() {
            Ok(p) => p,
            Err(e) => { eprintln!("error: {}", e); std::process::exit(1); }
        },
    };

    let mut crm = match AppConfig::load().and_then(|cfg| Crm::from_config(&cfg)) {
        Ok(c) => c,
        Err(e) => { eprintln!("error: {:#}", e); std::process::exit(1); }
    };
    let admin = NewUser {
        first_name: first_name.unwrap_or_else(|| "Admin".to_string()),
        last_name: last_name.unwrap_or_else(|| username.clone()),
        username,
        email,
        password,
        role: Role::Management,
    };
    match crm.bootstrap(admin) {
        Ok(view) => println!("created management user '{}' (id {})", view.username, view.id),
        Err(e) => {
            eprintln!("error: {}", e.message());
            std::process::exit(e.exit_code());
        }
    }
}

fn prompt_password() -> anyhow::Result<String> {
    let first = rpassword::prompt_password("password: ")?;
    let again = rpassword::prompt_password("repeat password: ")?;
    if first != again { anyhow::bail!("passwords do not match"); }
    Ok(first)
}
