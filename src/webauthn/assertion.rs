//! `WebAuthn` authentication (assertion) verification

use log::{debug, warn};

use super::attestation::{verify_client_data, verify_rp_id_hash, verify_user_flags};
use super::authenticator_data::AuthenticatorData;
use super::cose::AlgorithmPolicy;
use super::crypto::{sha256, verify_signature};
use super::errors::VerificationError;
use super::types::{AuthenticationCredential, AuthenticationResult, ClientDataType, StoredCredential};

/// Verify an authentication credential against a stored credential
///
/// Checks run in order: user handle, client data type, challenge, origin,
/// RP ID hash, user presence, user verification, signature and finally the
/// signature counter. The stored credential is never modified; on success
/// the caller persists the returned counter.
///
/// # Errors
/// Returns the `VerificationError` of the first check that fails.
pub fn verify_authentication(
    credential: &AuthenticationCredential,
    expected_challenge: &[u8],
    allowed_origins: &[String],
    allowed_rps: &[String],
    stored: &StoredCredential,
    policy: &AlgorithmPolicy,
) -> Result<AuthenticationResult, VerificationError> {
    run_authentication(
        credential,
        expected_challenge,
        allowed_origins,
        allowed_rps,
        stored,
        policy,
    )
    .inspect_err(|e| warn!("Authentication rejected: {} ({e})", e.code()))
}

fn run_authentication(
    credential: &AuthenticationCredential,
    expected_challenge: &[u8],
    allowed_origins: &[String],
    allowed_rps: &[String],
    stored: &StoredCredential,
    policy: &AlgorithmPolicy,
) -> Result<AuthenticationResult, VerificationError> {
    let response = &credential.response;

    let Some(user_handle) = &response.user_handle else {
        return Err(VerificationError::UserHandleMissing);
    };
    if user_handle != &stored.user_id {
        return Err(VerificationError::UserHandleMismatch);
    }

    verify_client_data(
        &response.client_data_json,
        ClientDataType::Get,
        expected_challenge,
        allowed_origins,
    )?;

    let auth_data = AuthenticatorData::parse(&response.authenticator_data)?;
    verify_rp_id_hash(&auth_data, allowed_rps)?;
    verify_user_flags(auth_data.flags)?;

    let client_data_hash = sha256(&response.client_data_json);
    let mut message = Vec::with_capacity(response.authenticator_data.len() + client_data_hash.len());
    message.extend_from_slice(&response.authenticator_data);
    message.extend_from_slice(&client_data_hash);

    if !verify_signature(&stored.public_key, &message, &response.signature, policy)? {
        return Err(VerificationError::SignatureVerificationFailed);
    }
    debug!("Assertion signature verified");

    let sign_count = check_sign_count(stored.sign_count, auth_data.sign_count)?;
    debug!("Authentication verified, sign count {sign_count}");

    Ok(AuthenticationResult { sign_count })
}

/// Apply the signature counter rule
///
/// When either counter is non-zero the received value must be strictly
/// greater than the stored one. Two zeros mean the authenticator has no
/// counter and are accepted.
pub(crate) fn check_sign_count(stored: u32, received: u32) -> Result<u32, VerificationError> {
    if (received > 0 || stored > 0) && received <= stored {
        return Err(VerificationError::ReplayCounterError { stored, received });
    }
    Ok(received)
}
