//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/orgsync/orgsync.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `ORGSYNC_*` prefix, `__` between sections
//!    (e.g. `ORGSYNC_REGISTRY__CLIENT_SECRET`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Default OAuth2 scope requested for registry access.
pub const DEFAULT_SCOPE: &str = "organizations:read organizations:write";

/// Registry connection settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrySettings {
    /// Base URL of the registry API, e.g. `https://registry.example/api`
    pub base_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Connect/read/write timeout per request
    pub timeout_secs: u64,
    /// Client-side request rate limit (requests per second)
    pub rate_limit_rps: Option<f64>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
            timeout_secs: 30,
            rate_limit_rps: None,
        }
    }
}

impl fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .field("timeout_secs", &self.timeout_secs)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .finish()
    }
}

impl RegistrySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Minimum spacing between requests, if rate limiting is enabled.
    ///
    /// Fails when the rate is so small that the interval overflows `Duration`.
    pub fn min_request_interval(&self) -> Result<Option<Duration>, ApplicationError> {
        let Some(rps) = self.rate_limit_rps.filter(|rps| *rps > 0.0) else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(1.0 / rps)
            .map(Some)
            .map_err(|e| ApplicationError::Config {
                message: format!("registry.rate_limit_rps {} is unusable: {}", rps, e),
            })
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("registry.base_url", &self.base_url),
            ("registry.token_url", &self.token_url),
            ("registry.client_id", &self.client_id),
            ("registry.client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// CSV input settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CsvSettings {
    /// Field delimiter; regional spreadsheet exports use `;`
    pub delimiter: char,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}

/// What to do when creating a missing organization fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreateFailurePolicy {
    /// Abort the whole run
    #[default]
    Abort,
    /// Block the node's subtree and continue with the rest
    Block,
}

/// Raw registry settings for intermediate parsing (None = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRegistrySettings {
    pub base_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub timeout_secs: Option<u64>,
    pub rate_limit_rps: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCsvSettings {
    pub delimiter: Option<char>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub registry: RawRegistrySettings,
    pub csv: RawCsvSettings,
    pub on_create_failure: Option<CreateFailurePolicy>,
}

/// Unified configuration for orgsync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub on_create_failure: CreateFailurePolicy,
    pub registry: RegistrySettings,
    pub csv: CsvSettings,
}

/// Get the XDG config directory for orgsync.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "orgsync").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("orgsync.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let base = &self.registry;
        let raw = &overlay.registry;
        Self {
            on_create_failure: overlay.on_create_failure.unwrap_or(self.on_create_failure),
            registry: RegistrySettings {
                base_url: raw.base_url.clone().unwrap_or_else(|| base.base_url.clone()),
                token_url: raw
                    .token_url
                    .clone()
                    .unwrap_or_else(|| base.token_url.clone()),
                client_id: raw
                    .client_id
                    .clone()
                    .unwrap_or_else(|| base.client_id.clone()),
                client_secret: raw
                    .client_secret
                    .clone()
                    .unwrap_or_else(|| base.client_secret.clone()),
                scope: raw.scope.clone().unwrap_or_else(|| base.scope.clone()),
                timeout_secs: raw.timeout_secs.unwrap_or(base.timeout_secs),
                rate_limit_rps: raw.rate_limit_rps.or(base.rate_limit_rps),
            },
            csv: CsvSettings {
                delimiter: overlay.csv.delimiter.unwrap_or(self.csv.delimiter),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply ORGSYNC_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ORGSYNC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        let registry = &mut settings.registry;
        if let Ok(val) = config.get_string("registry.base_url") {
            registry.base_url = val;
        }
        if let Ok(val) = config.get_string("registry.token_url") {
            registry.token_url = val;
        }
        if let Ok(val) = config.get_string("registry.client_id") {
            registry.client_id = val;
        }
        if let Ok(val) = config.get_string("registry.client_secret") {
            registry.client_secret = val;
        }
        if let Ok(val) = config.get_string("registry.scope") {
            registry.scope = val;
        }
        if let Ok(val) = config.get_string("registry.timeout_secs") {
            registry.timeout_secs = val.parse().map_err(|_| ApplicationError::Config {
                message: format!("ORGSYNC_REGISTRY__TIMEOUT_SECS is not a number: {}", val),
            })?;
        }
        if let Ok(val) = config.get_string("registry.rate_limit_rps") {
            let rps = val.parse().map_err(|_| ApplicationError::Config {
                message: format!("ORGSYNC_REGISTRY__RATE_LIMIT_RPS is not a number: {}", val),
            })?;
            registry.rate_limit_rps = Some(rps);
        }
        if let Ok(val) = config.get_string("csv.delimiter") {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => settings.csv.delimiter = c,
                _ => {
                    return Err(ApplicationError::Config {
                        message: format!("ORGSYNC_CSV__DELIMITER must be one character: {:?}", val),
                    })
                }
            }
        }
        if let Ok(val) = config.get_string("on_create_failure") {
            settings.on_create_failure = match val.to_lowercase().as_str() {
                "abort" => CreateFailurePolicy::Abort,
                "block" => CreateFailurePolicy::Block,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("ORGSYNC_ON_CREATE_FAILURE must be abort or block: {}", other),
                    })
                }
            };
        }

        Ok(settings)
    }

    /// Fail with one error naming every missing registry field, or on an
    /// unusable rate limit.
    pub fn validate_registry(&self) -> Result<(), ApplicationError> {
        let missing = self.registry.missing_fields();
        if !missing.is_empty() {
            return Err(ApplicationError::Config {
                message: format!("missing settings: {}", missing.join(", ")),
            });
        }
        self.registry.min_request_interval()?;
        Ok(())
    }

    /// Show the effective configuration as TOML, with the client secret masked.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        let mut shown = self.clone();
        if !shown.registry.client_secret.is_empty() {
            shown.registry.client_secret = "***".to_string();
        }
        toml::to_string_pretty(&shown).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# orgsync configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/orgsync/orgsync.toml
#   File:   --config <FILE>
#   Env:    ORGSYNC_* environment variables, e.g. ORGSYNC_REGISTRY__CLIENT_SECRET

# What to do when creating a missing organization fails: "abort" or "block"
# on_create_failure = "abort"

[registry]
# base_url = "https://registry.example.com/api"
# token_url = "https://registry.example.com/oauth/token"
# client_id = "orgsync"
# client_secret = "prefer ORGSYNC_REGISTRY__CLIENT_SECRET"
# scope = "organizations:read organizations:write"
# timeout_secs = 30
# rate_limit_rps = 5.0

[csv]
# delimiter = ";"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
