//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CARELINK_API_BASE_URL` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CARELINK_API_BASE_URL`: Base URL of the backend API (required)
//! - `CARELINK_LOGIN_PATH`: Authentication endpoint path
//! - `CARELINK_REFRESH_PATH`: Renewal endpoint path
//! - `CARELINK_REQUEST_TIMEOUT`: Per-request timeout in seconds
//! - `CARELINK_RENEWAL_TIMEOUT`: Renewal wait bound in seconds (`0` waits
//!   for the exchange to settle)
//! - `CARELINK_MAX_ATTEMPTS`: Transport attempts per send
//! - `CARELINK_STORE`: Credential store kind (`memory`, `file`, `keychain`)
//! - `CARELINK_STORE_PATH`: Credentials file path for the `file` store
//! - `CARELINK_KEYCHAIN_SERVICE` / `CARELINK_KEYCHAIN_ACCOUNT`: Keychain
//!   entry names for the `keychain` store
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./carelink.json` or `./carelink.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent directory
//! 4. The same names relative to the executable location

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use carelink_domain::constants::{DEFAULT_KEYCHAIN_ACCOUNT, DEFAULT_KEYCHAIN_SERVICE};
use carelink_domain::{
    CareLinkError, ClientConfig, Config, CredentialStoreConfig, Result, StoreKind,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["carelink.json", "carelink.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the base URL is
/// not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `CareLinkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value has the wrong type
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `CARELINK_API_BASE_URL` is required; every other field falls back
/// to its default.
///
/// # Errors
/// Returns `CareLinkError::Config` if the base URL is missing or a variable
/// has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let defaults = ClientConfig::default();

    let client = ClientConfig {
        base_url: env_var("CARELINK_API_BASE_URL")?,
        login_path: env_opt("CARELINK_LOGIN_PATH").unwrap_or(defaults.login_path),
        refresh_path: env_opt("CARELINK_REFRESH_PATH").unwrap_or(defaults.refresh_path),
        request_timeout_secs: env_parse("CARELINK_REQUEST_TIMEOUT")?
            .unwrap_or(defaults.request_timeout_secs),
        renewal_timeout_secs: match env_parse::<u64>("CARELINK_RENEWAL_TIMEOUT")? {
            Some(0) => None,
            Some(secs) => Some(secs),
            None => defaults.renewal_timeout_secs,
        },
        max_attempts: env_parse("CARELINK_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
    };

    Ok(Config { client, store: store_from_env()? })
}

fn store_from_env() -> Result<CredentialStoreConfig> {
    let kind = env_parse::<StoreKind>("CARELINK_STORE")?
        .unwrap_or_else(|| CredentialStoreConfig::default().kind());

    Ok(match kind {
        StoreKind::Memory => CredentialStoreConfig::Memory,
        StoreKind::File => match env_opt("CARELINK_STORE_PATH") {
            Some(path) => CredentialStoreConfig::File { path: PathBuf::from(path) },
            None => CredentialStoreConfig::default(),
        },
        StoreKind::Keychain => CredentialStoreConfig::Keychain {
            service: env_opt("CARELINK_KEYCHAIN_SERVICE")
                .unwrap_or_else(|| DEFAULT_KEYCHAIN_SERVICE.to_string()),
            account: env_opt("CARELINK_KEYCHAIN_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_KEYCHAIN_ACCOUNT.to_string()),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CareLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CareLinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CareLinkError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CareLinkError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CareLinkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CareLinkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CareLinkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, and the
/// executable's directory for each of `carelink.{json,toml}` and
/// `config.{json,toml}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
            roots.push(exe_dir.join(".."));
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        CareLinkError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Get optional environment variable, treating blank values as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CareLinkError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
