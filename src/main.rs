use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crmdesk::cli::Repl;
use crmdesk::config::{AppConfig, DEFAULT_LOG_FILTER};
use crmdesk::services::Crm;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cfg = AppConfig::load()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "crmdesk",
        "crmdesk starting: RUST_LOG='{}', data='{}', audit_log={:?}, session_timeout_secs={}",
        rust_log, cfg.data_path.display(), cfg.audit_log_path, cfg.session_timeout_secs
    );

    let crm = Crm::from_config(&cfg)?;
    Repl::new(crm).run()
}
