//! Configuration system for the `TooDo` client.
//!
//! Supports layered configuration with the following priority (highest
//! first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/toodo/config.toml`)
//! 4. Compiled defaults
//!
//! A missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error. The account password
//! is never read from the config file — CLI flag or environment only.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    service: ServiceFileConfig,
    account: AccountFileConfig,
    ui: UiFileConfig,
}

/// `[service]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServiceFileConfig {
    api_url: Option<String>,
    gateway_url: Option<String>,
}

/// `[account]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AccountFileConfig {
    email: Option<String>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Connection endpoints for the hosted services. `None` from
/// [`ClientConfig::to_service_config`] means offline demo mode.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL for the REST endpoints (auth + mutations).
    pub api_url: String,
    /// WebSocket URL of the document gateway's listen channel.
    pub gateway_url: String,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the REST endpoints.
    pub api_url: Option<String>,
    /// WebSocket URL of the document gateway.
    pub gateway_url: Option<String>,
    /// Account email to sign in with.
    pub email: Option<String>,
    /// Account password (CLI flag or environment only).
    pub password: Option<String>,
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            gateway_url: None,
            email: None,
            password: None,
            poll_timeout: Duration::from_millis(50),
            timestamp_format: "%d/%m/%y %H:%M".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Without `--config`, the default path
    /// (`~/.config/toodo/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given config file cannot
    /// be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            api_url: cli.api_url.clone().or_else(|| file.service.api_url.clone()),
            gateway_url: cli
                .gateway_url
                .clone()
                .or_else(|| file.service.gateway_url.clone()),
            email: cli.email.clone().or_else(|| file.account.email.clone()),
            password: cli.password.clone(),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Build a [`ServiceConfig`] if both endpoints are present.
    ///
    /// Returns `None` when either URL is missing (offline demo mode).
    #[must_use]
    pub fn to_service_config(&self) -> Option<ServiceConfig> {
        let api_url = self.api_url.clone()?;
        let gateway_url = self.gateway_url.clone()?;
        if api_url.is_empty() || gateway_url.is_empty() {
            return None;
        }
        Some(ServiceConfig {
            api_url,
            gateway_url,
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal client for the TooDo task service")]
pub struct CliArgs {
    /// Base URL for the REST endpoints (auth + task mutations).
    #[arg(long, env = "TOODO_API_URL")]
    pub api_url: Option<String>,

    /// WebSocket URL of the document gateway's listen channel.
    #[arg(long, env = "TOODO_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Account email to sign in with.
    #[arg(long, env = "TOODO_EMAIL")]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, env = "TOODO_PASSWORD")]
    pub password: Option<String>,

    /// Path to config file (default: `~/.config/toodo/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TOODO_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/toodo.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("toodo").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
