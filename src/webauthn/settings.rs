//! `WebAuthn` settings implementation
//!
//! Relying party identity, the origin and RP ID allow-lists, and the
//! algorithm allow-list, independent of how they are loaded.

use serde::{Deserialize, Serialize};
use url::Url;

use super::cose::{AlgorithmPolicy, CoseAlgorithm};
use super::errors::SettingsError;
use super::options::{AuthenticatorAttachment, DEFAULT_TIMEOUT_MS};

/// `WebAuthn` settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebAuthnSettings {
    /// Relying Party ID (usually the domain)
    pub rp_id: String,
    /// Relying Party name (displayed to user)
    pub rp_name: String,
    /// Origins accepted in client data, compared as exact strings
    pub allowed_origins: Vec<String>,
    /// RP IDs whose SHA-256 may appear in authenticator data
    pub allowed_rps: Vec<String>,
    /// COSE algorithm names, e.g. "ES256"
    pub algorithms: Vec<String>,
    /// Ceremony timeout in milliseconds
    pub timeout_ms: u32,
    /// Optional authenticator attachment hint for registration
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
}

impl Default for WebAuthnSettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Passkey RP".to_string(),
            allowed_origins: vec!["https://localhost".to_string()],
            allowed_rps: vec!["localhost".to_string()],
            algorithms: AlgorithmPolicy::default()
                .algorithms()
                .iter()
                .map(|alg| alg.name().to_string())
                .collect(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            authenticator_attachment: None,
        }
    }
}

impl WebAuthnSettings {
    /// Check the settings describe a usable relying party
    ///
    /// # Errors
    /// Returns the first `SettingsError` found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.rp_id.trim().is_empty() {
            return Err(SettingsError::EmptyRpId);
        }
        if self.allowed_origins.is_empty() {
            return Err(SettingsError::NoAllowedOrigins);
        }
        for origin in &self.allowed_origins {
            validate_origin(origin)?;
        }
        if self.allowed_rps.is_empty() {
            return Err(SettingsError::NoAllowedRelyingParties);
        }
        self.policy().map(|_| ())
    }

    /// Build the algorithm allow-list from the configured names
    ///
    /// # Errors
    /// `UnknownAlgorithm` for an unrecognised name, `NoAlgorithms` when the
    /// list is empty.
    pub fn policy(&self) -> Result<AlgorithmPolicy, SettingsError> {
        let algorithms = self
            .algorithms
            .iter()
            .map(|name| name.parse::<CoseAlgorithm>())
            .collect::<Result<Vec<_>, _>>()?;
        if algorithms.is_empty() {
            return Err(SettingsError::NoAlgorithms);
        }
        Ok(AlgorithmPolicy::new(algorithms))
    }
}

fn validate_origin(origin: &str) -> Result<(), SettingsError> {
    let url = Url::parse(origin)
        .map_err(|e| SettingsError::InvalidOrigin(origin.to_string(), e.to_string()))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if url.host_str() == Some("localhost") => Ok(()),
        _ => Err(SettingsError::InsecureOrigin(origin.to_string())),
    }
}
