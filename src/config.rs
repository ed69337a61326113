//! Runtime settings for embedders and the HTTP server

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::DEFAULT_MAP_SIZE;
use crate::error::{Error, Result};

/// Names the TOML settings file
pub const CONFIG_ENV: &str = "ROLEGATE_CONFIG";
/// Overrides `db_path`
pub const DB_ENV: &str = "ROLEGATE_DB";
/// Overrides `bind`
pub const BIND_ENV: &str = "ROLEGATE_BIND";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// LMDB environment directory
    pub db_path: PathBuf,
    /// LMDB map size in bytes
    pub map_size: usize,
    pub bind: String,
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Create the system roles on start
    pub seed: bool,
    /// Principal id that holds the admin role after start
    pub admin: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("./data/rolegate.mdb"),
            map_size: DEFAULT_MAP_SIZE,
            bind: "127.0.0.1:3000".into(),
            log_filter: "info".into(),
            seed: true,
            admin: None,
        }
    }
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Settings file named by `ROLEGATE_CONFIG` (defaults if unset), then env overrides
    pub fn load() -> Result<Self> {
        let settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        Ok(settings.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `ROLEGATE_DB` / `ROLEGATE_BIND` as looked up by `var`
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(db) = var(DB_ENV).filter(|v| !v.is_empty()) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(bind) = var(BIND_ENV).filter(|v| !v.is_empty()) {
            self.bind = bind;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn partial_file() {
        let s = Settings::parse(
            r#"
db_path = "/var/lib/rolegate"
seed = false
"#,
        )
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/var/lib/rolegate"));
        assert!(!s.seed);
        assert_eq!(s.bind, "127.0.0.1:3000");
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(Settings::parse("dbpath = \"x\""), Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_file() {
        let s = Settings::default().with_overrides(|k| match k {
            DB_ENV => Some("/tmp/db".into()),
            BIND_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(s.db_path, PathBuf::from("/tmp/db"));
        // empty values are ignored
        assert_eq!(s.bind, "127.0.0.1:3000");
    }
}
