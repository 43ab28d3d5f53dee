//! `WebAuthn` core types
//!
//! Credentials as they arrive from the client, the caller-owned stored
//! credential, and verification results.

use serde::{Deserialize, Serialize};

use crate::encoding::Buffer;

/// Credential type; "public-key" is the only value defined
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PublicKeyCredentialType {
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

/// Ceremony a client data object was collected for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientDataType {
    Create,
    Get,
}

impl ClientDataType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

/// Client data decoded from clientDataJSON
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub r#type: String,
    /// Base64URL-encoded challenge
    pub challenge: String,
    pub origin: String,
    #[serde(default)]
    pub cross_origin: Option<bool>,
}

/// A public key credential as returned by the client
///
/// The response type fixes which ceremony the credential belongs to; see
/// [`RegistrationCredential`] and [`AuthenticationCredential`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential<R> {
    #[serde(rename = "type", default)]
    pub r#type: PublicKeyCredentialType,
    pub raw_id: Buffer,
    pub response: R,
}

/// Authenticator attestation response during registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Buffer,
    pub attestation_object: Buffer,
}

/// Authenticator assertion response during authentication
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Buffer,
    pub authenticator_data: Buffer,
    pub signature: Buffer,
    #[serde(default)]
    pub user_handle: Option<Buffer>,
}

/// Credential returned by `navigator.credentials.create()`
pub type RegistrationCredential = PublicKeyCredential<AuthenticatorAttestationResponse>;

/// Credential returned by `navigator.credentials.get()`
pub type AuthenticationCredential = PublicKeyCredential<AuthenticatorAssertionResponse>;

/// Credential record persisted by the caller after registration
///
/// Only read by the verifiers. After a successful authentication the caller
/// writes the returned counter back, ideally in the same transaction that
/// read this record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub user_id: Buffer,
    /// COSE-encoded public key
    pub public_key: Buffer,
    pub sign_count: u32,
}

/// Outcome of a successful registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub sign_count: u32,
    pub credential_id: Buffer,
    /// COSE-encoded public key
    pub public_key: Buffer,
}

impl RegistrationResult {
    /// Build the record to persist for `user_id`
    #[must_use]
    pub fn into_stored_credential(self, user_id: impl Into<Buffer>) -> StoredCredential {
        StoredCredential {
            user_id: user_id.into(),
            public_key: self.public_key,
            sign_count: self.sign_count,
        }
    }
}

/// Outcome of a successful authentication
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    /// New counter value the caller must persist
    pub sign_count: u32,
}
