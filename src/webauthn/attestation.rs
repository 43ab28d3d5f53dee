//! `WebAuthn` registration (attestation) verification
//!
//! Also hosts the client data, relying party and user flag checks shared
//! with assertion verification.

use log::{debug, warn};

use super::authenticator_data::{AuthenticatorData, AuthenticatorFlags, MAX_CREDENTIAL_ID_LEN};
use super::cbor::AttestationObject;
use super::cose::{AlgorithmPolicy, CoseKey};
use super::crypto::sha256;
use super::errors::VerificationError;
use super::types::{ClientDataType, CollectedClientData, RegistrationCredential, RegistrationResult};
use crate::encoding::base64url_encode;

/// Verify a registration credential against the expected challenge and the
/// relying party's allowed origins and RP IDs
///
/// Checks run in a fixed order and the first failure is returned:
/// client data type, challenge, origin, attestation format, RP ID hash,
/// user presence, user verification, credential ID, key algorithm and
/// credential ID length.
///
/// # Errors
/// Returns the `VerificationError` of the first check that fails.
pub fn verify_registration(
    credential: &RegistrationCredential,
    expected_challenge: &[u8],
    allowed_origins: &[String],
    allowed_rps: &[String],
    policy: &AlgorithmPolicy,
) -> Result<RegistrationResult, VerificationError> {
    run_registration(credential, expected_challenge, allowed_origins, allowed_rps, policy)
        .inspect_err(|e| warn!("Registration rejected: {} ({e})", e.code()))
}

fn run_registration(
    credential: &RegistrationCredential,
    expected_challenge: &[u8],
    allowed_origins: &[String],
    allowed_rps: &[String],
    policy: &AlgorithmPolicy,
) -> Result<RegistrationResult, VerificationError> {
    let response = &credential.response;

    verify_client_data(
        &response.client_data_json,
        ClientDataType::Create,
        expected_challenge,
        allowed_origins,
    )?;

    let attestation = AttestationObject::decode(&response.attestation_object)?;
    let auth_data = attestation.auth_data;

    verify_rp_id_hash(&auth_data, allowed_rps)?;
    verify_user_flags(auth_data.flags)?;

    let Some(attested) = auth_data.attested_credential_data else {
        return Err(VerificationError::MissingAttestedCredentialData);
    };

    if attested.credential_id != credential.raw_id.as_bytes() {
        return Err(VerificationError::CredentialIdMismatch);
    }

    let key = CoseKey::from_bytes(&attested.credential_public_key, policy)?;
    debug!("Credential public key uses {}", key.algorithm());

    if attested.credential_id.len() > MAX_CREDENTIAL_ID_LEN {
        return Err(VerificationError::CredentialIdTooLong(
            attested.credential_id.len(),
        ));
    }

    debug!("Registration verified, sign count {}", auth_data.sign_count);

    Ok(RegistrationResult {
        sign_count: auth_data.sign_count,
        credential_id: attested.credential_id.into(),
        public_key: attested.credential_public_key.into(),
    })
}

/// Decode clientDataJSON and check type, challenge and origin
pub(crate) fn verify_client_data(
    client_data_json: &[u8],
    expected_type: ClientDataType,
    expected_challenge: &[u8],
    allowed_origins: &[String],
) -> Result<CollectedClientData, VerificationError> {
    let client_data: CollectedClientData = serde_json::from_slice(client_data_json)
        .map_err(|e| VerificationError::MalformedClientData(e.to_string()))?;

    if client_data.r#type != expected_type.as_str() {
        return Err(VerificationError::ClientDataTypeMismatch {
            expected: expected_type.as_str(),
            actual: client_data.r#type,
        });
    }

    if client_data.challenge != base64url_encode(expected_challenge) {
        return Err(VerificationError::ChallengeMismatch);
    }

    if !allowed_origins.iter().any(|o| *o == client_data.origin) {
        return Err(VerificationError::OriginNotAllowed(client_data.origin));
    }

    debug!("Client data verified for origin {}", client_data.origin);
    Ok(client_data)
}

/// Require the RP ID hash to match the SHA-256 of one allowed RP ID
///
/// The allow-list is hashed on every call.
pub(crate) fn verify_rp_id_hash(
    auth_data: &AuthenticatorData,
    allowed_rps: &[String],
) -> Result<(), VerificationError> {
    if allowed_rps
        .iter()
        .any(|rp| sha256(rp.as_bytes()) == auth_data.rp_id_hash)
    {
        Ok(())
    } else {
        Err(VerificationError::RelyingPartyNotAllowed)
    }
}

/// Require both user presence and user verification
pub(crate) fn verify_user_flags(flags: AuthenticatorFlags) -> Result<(), VerificationError> {
    if !flags.user_present {
        return Err(VerificationError::UserNotPresent);
    }
    if !flags.user_verified {
        return Err(VerificationError::UserNotVerified);
    }
    Ok(())
}
