//! Application configuration and session-store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizdesk_core::model::{Account, QuestionBank};
use quizdesk_core::parser::load_banks;
use quizdesk_core::seed::{self, DEFAULT_ADMIN_ID};
use quizdesk_core::traits::SessionStore;

use crate::file::FileSessionStore;
use crate::mock::MemorySessionStore;

/// Where the session cache lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_session_path")]
        path: PathBuf,
    },
    /// Nothing survives the process.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from("./.quizdesk/session.json")
}

/// Top-level quizdesk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizdeskConfig {
    /// Simulated round-trip delay for login and registration.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Session cache backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Unique ID of the seeded master account.
    #[serde(default = "default_admin_id")]
    pub admin_id: String,
    /// Seeded student accounts.
    #[serde(default = "default_students")]
    pub students: Vec<String>,
    /// Question-bank file or directory. The built-in bank is used if unset.
    #[serde(default)]
    pub question_banks: Option<PathBuf>,
}

fn default_latency_ms() -> u64 {
    500
}
fn default_admin_id() -> String {
    DEFAULT_ADMIN_ID.to_string()
}
fn default_students() -> Vec<String> {
    vec!["student1".to_string(), "student2".to_string()]
}

impl Default for QuizdeskConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            store: StoreConfig::default(),
            admin_id: default_admin_id(),
            students: default_students(),
            question_banks: None,
        }
    }
}

impl QuizdeskConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Seed accounts: the configured admin followed by the students.
    pub fn seed_accounts(&self) -> Vec<Account> {
        seed::accounts(&self.admin_id, self.students.iter().cloned())
    }

    /// Load the configured question banks, or the built-in bank.
    pub fn load_question_bank(&self) -> Result<QuestionBank> {
        match &self.question_banks {
            Some(path) => load_banks(path)
                .with_context(|| format!("failed to load question banks: {}", path.display())),
            None => Ok(seed::default_question_bank()),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

/// Replace each `${NAME}` with `lookup(NAME)`, or nothing when unset.
///
/// Substituted values are copied as-is and never expanded again. An
/// unterminated `${` is kept literally.
fn expand_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&lookup(&rest[start + 2..start + 2 + len]).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Resolve env vars in every string-valued setting.
fn resolve_config(config: QuizdeskConfig) -> QuizdeskConfig {
    QuizdeskConfig {
        latency_ms: config.latency_ms,
        store: match config.store {
            StoreConfig::File { path } => StoreConfig::File {
                path: resolve_path(&path),
            },
            StoreConfig::Memory => StoreConfig::Memory,
        },
        admin_id: resolve_env_vars(&config.admin_id),
        students: config.students.iter().map(|s| resolve_env_vars(s)).collect(),
        question_banks: config.question_banks.as_deref().map(resolve_path),
    }
}

/// Apply `QUIZDESK_SESSION_PATH` and `QUIZDESK_LATENCY_MS` overrides.
fn apply_env_overrides(
    mut config: QuizdeskConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<QuizdeskConfig> {
    if let Some(path) = lookup("QUIZDESK_SESSION_PATH") {
        config.store = StoreConfig::File {
            path: PathBuf::from(path),
        };
    }

    if let Some(latency) = lookup("QUIZDESK_LATENCY_MS") {
        config.latency_ms = latency
            .trim()
            .parse()
            .with_context(|| format!("invalid QUIZDESK_LATENCY_MS: {latency}"))?;
    }

    Ok(config)
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizdesk.toml` in the current directory
/// 2. `~/.config/quizdesk/config.toml`
///
/// Environment variable overrides: `QUIZDESK_SESSION_PATH`,
/// `QUIZDESK_LATENCY_MS`.
pub fn load_config() -> Result<QuizdeskConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizdeskConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizdesk.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let parsed = toml::from_str::<QuizdeskConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            parsed
        }
        None => QuizdeskConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    Ok(resolve_config(config))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizdesk"))
}

/// Create a session store from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn SessionStore> {
    match config {
        StoreConfig::File { path } => Arc::new(FileSessionStore::new(path.clone())),
        StoreConfig::Memory => Arc::new(MemorySessionStore::new()),
    }
}
