// Copyright 2026 Oxide Computer Company

//! Configuration for the specdiff server
//!
//! The configuration file is TOML.  The `http_api_server` and `log` sections
//! are Dropshot's own [`ConfigDropshot`] and [`ConfigLogging`]; the remaining
//! sections belong to this crate:
//!
//! ```
//! use specdiff::ConfigSpecDiff;
//!
//! let config: ConfigSpecDiff = toml::from_str(
//!     r##"
//!         [http_api_server]
//!         bind_address = "127.0.0.1:12345"
//!
//!         [log]
//!         mode = "stderr-terminal"
//!         level = "info"
//!
//!         ## Optional: defaults to the system temporary directory
//!         [workspace]
//!         scratch_dir = "/var/tmp"
//!
//!         [upload]
//!         max_bytes = 1048576
//!         timeout_secs = 30
//!
//!         [loader]
//!         allow_external_refs = false
//!
//!         [comparison]
//!         exclude_examples = true
//!     "##,
//! )
//! .unwrap();
//! assert_eq!(config.upload.max_bytes, 1048576);
//! assert!(!config.loader.allow_external_refs);
//! ```

use crate::compare::ComparisonConfig;
use crate::compare::CompareError;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingLevel;
use serde::Deserialize;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration for the specdiff server.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConfigSpecDiff {
    /// Dropshot server configuration
    #[serde(default = "default_http_api_server")]
    pub http_api_server: ConfigDropshot,
    /// Server-wide logging configuration
    #[serde(default = "default_log")]
    pub log: ConfigLogging,
    /// Where per-request workspaces are created
    #[serde(default)]
    pub workspace: ConfigWorkspace,
    /// Limits applied to uploads
    #[serde(default)]
    pub upload: ConfigUpload,
    /// How uploaded documents are loaded
    #[serde(default)]
    pub loader: ConfigLoader,
    /// Comparison flags used by the `/diff` endpoint.  `/breaking-changes`
    /// uses the same flags with `breaking_only` turned on.
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigWorkspace {
    /// Directory under which workspaces are created.  Defaults to the
    /// system temporary directory.
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl ConfigWorkspace {
    pub fn scratch_dir(&self) -> Result<Utf8PathBuf, LoadConfigError> {
        match &self.scratch_dir {
            Some(dir) => Ok(dir.clone()),
            None => Utf8PathBuf::try_from(std::env::temp_dir()).map_err(
                |error| LoadConfigError::TempDir(error.into_path_buf()),
            ),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigUpload {
    /// Maximum size of a whole request body, defaults to 32 MiB
    pub max_bytes: u64,
    /// Time allowed for staging, loading and comparing, defaults to 120
    pub timeout_secs: u64,
}

impl ConfigUpload {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConfigUpload {
    fn default() -> Self {
        ConfigUpload { max_bytes: 32 * 1024 * 1024, timeout_secs: 120 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLoader {
    /// Whether `$ref`s may point into other files on the server, either by
    /// absolute path or relative to the staged document.  Defaults to true.
    pub allow_external_refs: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        ConfigLoader { allow_external_refs: true }
    }
}

fn default_http_api_server() -> ConfigDropshot {
    ConfigDropshot {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
        ..Default::default()
    }
}

fn default_log() -> ConfigLogging {
    ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info }
}

impl Default for ConfigSpecDiff {
    fn default() -> Self {
        ConfigSpecDiff {
            http_api_server: default_http_api_server(),
            log: default_log(),
            workspace: ConfigWorkspace::default(),
            upload: ConfigUpload::default(),
            loader: ConfigLoader::default(),
            comparison: ComparisonConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("read \"{path}\": {err}")]
    Io { path: Utf8PathBuf, err: std::io::Error },
    #[error("parse \"{path}\": {err}")]
    Parse { path: Utf8PathBuf, err: toml::de::Error },
    #[error("invalid comparison configuration: {0}")]
    Comparison(#[from] CompareError),
    #[error("system temporary directory is not valid UTF-8: {0:?}")]
    TempDir(std::path::PathBuf),
}

impl ConfigSpecDiff {
    /// Load a `ConfigSpecDiff` from the given TOML file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, LoadConfigError> {
        let file_contents = std::fs::read_to_string(path).map_err(|err| {
            LoadConfigError::Io { path: path.to_owned(), err }
        })?;
        let config: ConfigSpecDiff = toml::from_str(&file_contents).map_err(
            |err| LoadConfigError::Parse { path: path.to_owned(), err },
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts of the configuration that cannot be checked while
    /// deserializing.
    pub fn validate(&self) -> Result<(), LoadConfigError> {
        self.comparison.validate()?;
        Ok(())
    }
}
