use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const EXECUTABLE: &str = "semanage";

/// Where to find `semanage`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Explicit executable path; wins over `search_paths`.
    pub semanage: Option<PathBuf>,
    /// Candidate locations, first existing one is used.
    pub search_paths: Vec<PathBuf>,
}

impl ToolConfig {
    /// Pick the executable: `cli_override`, then `semanage`, then the first existing
    /// search path, then a bare `semanage` looked up through `PATH` at spawn time.
    pub fn resolve_semanage(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        if let Some(path) = &self.semanage {
            return path.clone();
        }
        self.search_paths
            .iter()
            .find(|candidate| candidate.is_file())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(EXECUTABLE))
    }
}

/// Errors returned when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&raw, path.display().to_string())
}

/// Built-in configuration.
pub fn default_config() -> ToolConfig {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/selinux-ports.toml"
    ));
    match parse_config(embedded, "embedded config".to_string()) {
        Ok(config) if !config.search_paths.is_empty() => config,
        _ => fallback_config(),
    }
}

fn parse_config(raw: &str, path: String) -> Result<ToolConfig, ConfigLoadError> {
    toml::from_str(raw).map_err(|source| ConfigLoadError::Parse { path, source })
}

fn fallback_config() -> ToolConfig {
    ToolConfig {
        semanage: None,
        search_paths: ["/usr/sbin/semanage", "/sbin/semanage", "/usr/bin/semanage"]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
    }
}
