//! Runtime configuration: optional JSON file named by `CRMDESK_CONFIG`, then
//! environment overrides. Every field has a default so an empty `{}` is valid.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// `EnvFilter` directive used by the binaries when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Argon2id cost parameters. Defaults sit exactly on the enforced minimum.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HashParams {
    #[serde(default = "HashParams::default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "HashParams::default_iterations")]
    pub iterations: u32,
    #[serde(default = "HashParams::default_parallelism")]
    pub parallelism: u32,
}

impl HashParams {
    pub const MIN_MEMORY_KIB: u32 = 19 * 1024;
    pub const MIN_ITERATIONS: u32 = 2;

    fn default_memory_kib() -> u32 { Self::MIN_MEMORY_KIB }
    fn default_iterations() -> u32 { Self::MIN_ITERATIONS }
    fn default_parallelism() -> u32 { 1 }

    /// Reject anything cheaper than the minimum work factor.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < Self::MIN_MEMORY_KIB {
            return Err(anyhow!("weak_hash_params: memory_kib must be >= {}", Self::MIN_MEMORY_KIB));
        }
        if self.iterations < Self::MIN_ITERATIONS {
            return Err(anyhow!("weak_hash_params: iterations must be >= {}", Self::MIN_ITERATIONS));
        }
        if self.parallelism == 0 {
            return Err(anyhow!("weak_hash_params: parallelism must be >= 1"));
        }
        Ok(())
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self { memory_kib: Self::default_memory_kib(), iterations: Self::default_iterations(), parallelism: Self::default_parallelism() }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AppConfig {
    /// JSON snapshot backing the record store.
    #[serde(default = "AppConfig::default_data_path")]
    pub data_path: PathBuf,
    /// Optional JSON-lines audit file. The tracing audit sink is always on.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
    /// Inactivity window, measured from the last successful call.
    #[serde(default = "AppConfig::default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default)]
    pub hash: HashParams,
}

impl AppConfig {
    fn default_data_path() -> PathBuf { PathBuf::from("crmdesk-data.json") }
    fn default_session_timeout_secs() -> u64 { 15 * 60 }

    /// Fails for values chrono cannot represent; `validate` rejects those up front.
    pub fn session_timeout(&self) -> Result<chrono::Duration> {
        i64::try_from(self.session_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| anyhow!("session_timeout_secs={} is out of range", self.session_timeout_secs))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&bytes).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// File (if `CRMDESK_CONFIG` is set), then env overrides, then validation.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("CRMDESK_CONFIG") {
            Ok(p) if !p.trim().is_empty() => Self::from_file(Path::new(p.trim()))?,
            _ => Self::default(),
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Split out from `load` so tests can feed variables without touching the process env.
    pub fn apply_env_overrides<F: Fn(&str) -> Option<String>>(&mut self, var: F) -> Result<()> {
        if let Some(v) = var("CRMDESK_DATA") { if !v.is_empty() { self.data_path = PathBuf::from(v); } }
        if let Some(v) = var("CRMDESK_AUDIT_LOG") {
            self.audit_log_path = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = var("CRMDESK_SESSION_TIMEOUT_SECS") {
            self.session_timeout_secs = v.trim().parse().with_context(|| format!("CRMDESK_SESSION_TIMEOUT_SECS='{}'", v))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_secs == 0 { return Err(anyhow!("session_timeout_secs must be > 0")); }
        self.session_timeout()?;
        self.hash.validate()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: Self::default_data_path(),
            audit_log_path: None,
            session_timeout_secs: Self::default_session_timeout_secs(),
            hash: HashParams::default(),
        }
    }
}
