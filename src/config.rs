//! Configuration loaded from `sqlshim.toml`.
//!
//! ```toml
//! strict = false
//! log_filter = "sqlshim=debug"
//!
//! [backend]
//! kind = "memory"            # or "postgres"
//! fixture = "fixtures/users.json"
//! database_url = "postgres://localhost/app"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::TranslatorConfig;
use crate::error::{TranslationError, TranslationResult};

const LOCAL_FILE: &str = "sqlshim.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fail on unrecognized statements.
    pub strict: bool,
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub database_url: Option<String>,
    /// JSON fixture seeding the in-memory store.
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Postgres,
}

impl Config {
    pub fn from_toml(content: &str) -> TranslationResult<Self> {
        toml::from_str(content).map_err(|e| TranslationError::Config(e.to_string()))
    }

    pub fn load_from(path: &Path) -> TranslationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TranslationError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `./sqlshim.toml`, else `<config dir>/sqlshim/config.toml`, else defaults.
    pub fn load() -> TranslationResult<Self> {
        match Self::locate() {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::load_from(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("sqlshim").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// The part of the configuration the executor reads.
    pub fn translator(&self) -> TranslatorConfig {
        TranslatorConfig {
            strict: self.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert!(!config.translator().strict);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
strict = true
log_filter = "sqlshim=debug"

[backend]
kind = "postgres"
database_url = "postgres://localhost/app"
"#,
        )
        .unwrap();

        assert!(config.translator().strict);
        assert_eq!(config.log_filter.as_deref(), Some("sqlshim=debug"));
        assert_eq!(config.backend.kind, BackendKind::Postgres);
        assert_eq!(
            config.backend.database_url.as_deref(),
            Some("postgres://localhost/app")
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("stict = true").unwrap_err();
        assert!(matches!(err, TranslationError::Config(_)));

        let err = Config::from_toml("[backend]\nkind = \"mongo\"").unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load_from(Path::new("/nonexistent/sqlshim.toml")).unwrap_err();
        assert!(matches!(err, TranslationError::Io(_)));
    }
}
