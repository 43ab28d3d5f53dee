#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Relying-party verification of `WebAuthn` / FIDO2 ceremonies.
//!
//! The [`webauthn`] module holds the verification core: COSE key decoding,
//! signature verification, authenticator data parsing, attestation object
//! decoding and the registration / authentication verifiers. The
//! [`encoding`] module is the transport codec used to move byte buffers
//! through JSON, and [`settings`] loads the relying-party configuration.

/// Version of the passkey-rp library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod encoding;
pub mod settings;
pub mod webauthn;

/// Re-export commonly used items
pub use encoding::{Buffer, TransportValue};
pub use settings::Settings;
pub use webauthn::{
    verify_authentication, verify_registration, AlgorithmPolicy, AuthenticationCredential,
    AuthenticationResult, CoseAlgorithm, RegistrationCredential, RegistrationResult,
    StoredCredential, VerificationError, WebAuthnService, WebAuthnSettings,
};
