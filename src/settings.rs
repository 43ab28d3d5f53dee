use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::webauthn::WebAuthnSettings;

/// Directory searched for an overriding `Settings.toml`
pub const CONFIG_DIR_ENV: &str = "PASSKEY_RP_CONFIG_DIR";
const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub webauthn: WebAuthnSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables,
    /// then initialise logging and validate the relying party
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file cannot be read or parsed
    /// - The resulting `WebAuthn` settings fail validation
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        initialize_logging(&settings.logging.level);

        settings
            .webauthn
            .validate()
            .context("invalid WebAuthn settings")?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSKEY_RP_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    pub fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::read_settings_file(&default_config_path)?;
        }

        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            let config_path = Path::new(&config_dir).join(SETTINGS_FILE);
            if config_path.exists() {
                settings = Self::read_settings_file(&config_path)?;
            }
        }

        Ok(settings)
    }

    /// Parse one `Settings.toml`; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn read_settings_file(path: &Path) -> anyhow::Result<Self> {
        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_webauthn_env_overrides(&mut settings.webauthn);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_webauthn_env_overrides(webauthn: &mut WebAuthnSettings) {
        if let Ok(rp_id) = std::env::var("WEBAUTHN_RP_ID") {
            webauthn.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("WEBAUTHN_RP_NAME") {
            webauthn.rp_name = rp_name;
        }
        Self::apply_list_env_override("WEBAUTHN_ALLOWED_ORIGINS", &mut webauthn.allowed_origins);
        Self::apply_list_env_override("WEBAUTHN_ALLOWED_RPS", &mut webauthn.allowed_rps);
        Self::apply_list_env_override("WEBAUTHN_ALGORITHMS", &mut webauthn.algorithms);
        if let Ok(timeout_str) = std::env::var("WEBAUTHN_TIMEOUT_MS") {
            if let Ok(timeout) = timeout_str.parse::<u32>() {
                webauthn.timeout_ms = timeout;
            }
        }
    }

    /// Comma-separated list; blank entries are dropped
    fn apply_list_env_override(env_var: &str, target: &mut Vec<String>) {
        if let Ok(value) = std::env::var(env_var) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }
}

/// Initialise `env_logger` with a `RUST_LOG`-style filter
///
/// Does nothing if a logger is already installed.
pub fn initialize_logging(filters: &str) {
    let result = env_logger::Builder::new().parse_filters(filters).try_init();
    if result.is_err() {
        log::debug!("Logger already initialised, keeping existing configuration");
    }
}
