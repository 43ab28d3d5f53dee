//! `WebAuthn` error types
//!
//! Every rejection reason is its own variant so callers can branch, log and
//! count on the kind of failure without matching on message text.

/// Reasons a registration or authentication ceremony is rejected
///
/// All variants are terminal. No partial result is ever returned alongside
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// clientDataJSON is not UTF-8 JSON with the expected members
    #[error("malformed client data: {0}")]
    MalformedClientData(String),

    #[error("client data type mismatch: expected {expected}, got {actual}")]
    ClientDataTypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("challenge mismatch")]
    ChallengeMismatch,

    #[error("origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("relying party not allowed")]
    RelyingPartyNotAllowed,

    #[error("user not present")]
    UserNotPresent,

    #[error("user not verified")]
    UserNotVerified,

    #[error("credential id mismatch")]
    CredentialIdMismatch,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(i64),

    #[error("invalid curve: {0}")]
    InvalidCurve(i64),

    #[error("malformed COSE key field: {0}")]
    MalformedKeyField(&'static str),

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("attestation format not supported: {0}")]
    AttestationFormatUnsupported(String),

    #[error("malformed attestation object: {0}")]
    MalformedAttestationObject(String),

    #[error("credential id is too long: {0} bytes")]
    CredentialIdTooLong(usize),

    #[error("authenticator data truncated: need {expected} bytes, got {actual}")]
    TruncatedAuthenticatorData { expected: usize, actual: usize },

    #[error("attested credential data missing")]
    MissingAttestedCredentialData,

    #[error("malformed signature: {0}")]
    SignatureFormatError(&'static str),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The authenticator reported a counter that did not advance, which can
    /// indicate a cloned authenticator
    #[error("signature counter error: stored {stored}, received {received}")]
    ReplayCounterError { stored: u32, received: u32 },

    #[error("user handle is not present")]
    UserHandleMissing,

    #[error("user handle is not associated with credential")]
    UserHandleMismatch,
}

impl VerificationError {
    /// Stable identifier for log and metric labels
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedClientData(_) => "malformed_client_data",
            Self::ClientDataTypeMismatch { .. } => "client_data_type_mismatch",
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::OriginNotAllowed(_) => "origin_not_allowed",
            Self::RelyingPartyNotAllowed => "relying_party_not_allowed",
            Self::UserNotPresent => "user_not_present",
            Self::UserNotVerified => "user_not_verified",
            Self::CredentialIdMismatch => "credential_id_mismatch",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::UnsupportedKeyType(_) => "unsupported_key_type",
            Self::InvalidCurve(_) => "invalid_curve",
            Self::MalformedKeyField(_) => "malformed_key_field",
            Self::InvalidKeyMaterial(_) => "invalid_key_material",
            Self::AttestationFormatUnsupported(_) => "attestation_format_unsupported",
            Self::MalformedAttestationObject(_) => "malformed_attestation_object",
            Self::CredentialIdTooLong(_) => "credential_id_too_long",
            Self::TruncatedAuthenticatorData { .. } => "truncated_authenticator_data",
            Self::MissingAttestedCredentialData => "missing_attested_credential_data",
            Self::SignatureFormatError(_) => "signature_format_error",
            Self::SignatureVerificationFailed => "signature_verification_failed",
            Self::ReplayCounterError { .. } => "replay_counter_error",
            Self::UserHandleMissing => "user_handle_missing",
            Self::UserHandleMismatch => "user_handle_mismatch",
        }
    }
}

/// Invalid relying-party configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("relying party ID cannot be empty")]
    EmptyRpId,

    #[error("at least one allowed origin is required")]
    NoAllowedOrigins,

    #[error("invalid origin {0}: {1}")]
    InvalidOrigin(String, String),

    #[error("origin must be https:// except for localhost: {0}")]
    InsecureOrigin(String),

    #[error("at least one allowed relying party ID is required")]
    NoAllowedRelyingParties,

    #[error("at least one algorithm must be allowed")]
    NoAlgorithms,

    #[error("unknown algorithm name: {0}")]
    UnknownAlgorithm(String),
}

/// Rejected ceremony option arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("challenge should be at least {min} bytes, got {actual}")]
    ChallengeTooShort { min: usize, actual: usize },

    #[error("userVerification must be set to required, other options are not supported")]
    UserVerificationUnsupported,

    #[error("residentKey must be set to required, other options are not supported")]
    ResidentKeyUnsupported,

    #[error("failed to generate random challenge")]
    RandomUnavailable,
}
