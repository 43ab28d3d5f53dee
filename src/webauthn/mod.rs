//! `WebAuthn` implementation
//!
//! Relying-party verification for the registration and authentication
//! ceremonies, independent of any storage or transport. Only "none"
//! attestation is supported and extensions are ignored.

mod assertion;
mod attestation;
pub mod authenticator_data;
pub mod cbor;
pub mod cose;
pub mod crypto;
mod errors;
pub mod options;
mod service;
mod settings;
mod types;

// Re-exports for public use
pub use assertion::verify_authentication;
pub use attestation::verify_registration;
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use cbor::AttestationObject;
pub use cose::{AlgorithmPolicy, CoseAlgorithm, CoseCurve, CoseKey};
pub use errors::{OptionsError, SettingsError, VerificationError};
pub use options::{credential_creation_options, credential_request_options};
pub use service::WebAuthnService;
pub use settings::WebAuthnSettings;
pub use types::*;
