// Copyright (c) 2026 Phantom Labs
// SPDX-License-Identifier: AGPL-3.0

// Builder configuration manifest.
//
// A YAML document with apiVersion/kind/metadata/spec. The spec says where
// the backend lives and how to authenticate against it, which directory
// holds the local storage slots, and what explorer links point at.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::repository::{LISTINGS_KEY, SIGNATURES_KEY, WALLET_KEY};

pub const API_VERSION: &str = "phantom.dev/v1";
pub const KIND: &str = "BuilderConfig";

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "PHANTOM_CONFIG_PATH";

/// A location checked during config discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCandidate {
    pub origin: &'static str,
    pub path: PathBuf,
}

impl ConfigCandidate {
    fn new(origin: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            origin,
            path: path.into(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Top-level Kubernetes-style builder configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// API version (must be "phantom.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "BuilderConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: BuilderConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfigSpec {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub explorer: ExplorerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL; endpoints live under `<base_url>/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request (supports "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// API key with `env:VAR_NAME` references resolved.
    pub fn resolved_api_key(&self) -> Option<String> {
        let key = self.api_key.as_ref()?;
        match key.strip_prefix("env:") {
            Some(var) => std::env::var(var).ok(),
            None => Some(key.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the durable key-value slots
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    #[serde(default = "default_listings_key")]
    pub listings_key: String,

    #[serde(default = "default_signatures_key")]
    pub signatures_key: String,

    #[serde(default = "default_wallet_key")]
    pub wallet_key: String,
}

impl StorageConfig {
    /// Storage directory with a leading `~` expanded to the home directory.
    pub fn resolved_path(&self) -> PathBuf {
        match self.path.strip_prefix("~") {
            Ok(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            Err(_) => self.path.clone(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            listings_key: default_listings_key(),
            signatures_key: default_signatures_key(),
            wallet_key: default_wallet_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_explorer_base")]
    pub base_url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_explorer_base(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".phantom")
        .join("storage")
}

fn default_listings_key() -> String {
    LISTINGS_KEY.to_string()
}

fn default_signatures_key() -> String {
    SIGNATURES_KEY.to_string()
}

fn default_wallet_key() -> String {
    WALLET_KEY.to_string()
}

fn default_explorer_base() -> String {
    "https://sepolia.starkscan.co/tx".to_string()
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "phantom-builder".to_string(),
                version: None,
            },
            spec: BuilderConfigSpec::default(),
        }
    }
}

impl BuilderConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Places a config file may live when no `--config` is given, highest
    /// priority first. Candidates are listed whether or not they exist.
    pub fn config_candidates() -> Vec<ConfigCandidate> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            candidates.push(ConfigCandidate::new(CONFIG_PATH_ENV, path));
        }
        candidates.push(ConfigCandidate::new("working directory", "./phantom-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            candidates.push(ConfigCandidate::new(
                "user home",
                home.join(".phantom").join("config.yaml"),
            ));
        }
        if cfg!(unix) {
            candidates.push(ConfigCandidate::new("system", "/etc/phantom/config.yaml"));
        }
        candidates
    }

    /// First candidate that exists on disk.
    pub fn discover_config() -> Option<PathBuf> {
        Self::config_candidates()
            .into_iter()
            .find(ConfigCandidate::exists)
            .map(|candidate| candidate.path)
    }

    /// Read the explicit path if one is given (it must load), else the first
    /// discovered file, else the built-in defaults. Environment overrides
    /// are applied on top in every case.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match cli_path.or_else(Self::discover_config) {
            Some(path) => {
                tracing::info!(path = %path.display(), "Reading builder configuration");
                Self::from_yaml_file(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
            }
            None => {
                tracing::warn!("No builder configuration found, running with defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// `PHANTOM_API_URL`, `PHANTOM_API_KEY`, `PHANTOM_STORAGE_PATH` and
    /// `PHANTOM_REQUEST_TIMEOUT_SECS` replace the matching manifest fields.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PHANTOM_API_URL") {
            tracing::info!("Environment override: PHANTOM_API_URL={}", val);
            self.spec.api.base_url = val;
        }

        if let Ok(val) = std::env::var("PHANTOM_API_KEY") {
            tracing::info!("Environment override: PHANTOM_API_KEY=<redacted>");
            self.spec.api.api_key = Some(val);
        }

        if let Ok(val) = std::env::var("PHANTOM_STORAGE_PATH") {
            tracing::info!("Environment override: PHANTOM_STORAGE_PATH={}", val);
            self.spec.storage.path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("PHANTOM_REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: PHANTOM_REQUEST_TIMEOUT_SECS={}", secs);
                    self.spec.api.request_timeout_secs = Some(secs);
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for PHANTOM_REQUEST_TIMEOUT_SECS: '{}'. Expected seconds. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Reject manifests the builder cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        url::Url::parse(&self.spec.api.base_url).map_err(|e| {
            anyhow::anyhow!("Invalid spec.api.base_url '{}': {}", self.spec.api.base_url, e)
        })?;

        if self.spec.api.request_timeout_secs == Some(0) {
            anyhow::bail!("spec.api.request_timeout_secs must be greater than zero");
        }

        let storage = &self.spec.storage;
        for (field, key) in [
            ("listings_key", &storage.listings_key),
            ("signatures_key", &storage.signatures_key),
            ("wallet_key", &storage.wallet_key),
        ] {
            if key.trim().is_empty() {
                anyhow::bail!("spec.storage.{} cannot be empty", field);
            }
        }

        Ok(())
    }
}
