//! Ceremony options for `navigator.credentials.create()` and `.get()`
//!
//! Only user-verifying authenticators with resident keys and "none"
//! attestation are supported; the builders reject anything else.

use serde::{Deserialize, Serialize};

use super::cose::AlgorithmPolicy;
use super::crypto::generate_challenge;
use super::errors::OptionsError;
use super::types::PublicKeyCredentialType;
use crate::encoding::Buffer;

/// Shortest challenge the builders accept, in bytes
pub const MIN_CHALLENGE_LEN: usize = 16;

/// Ceremony timeout used when none is given
pub const DEFAULT_TIMEOUT_MS: u32 = 300_000;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    Hybrid,
    Internal,
}

/// Attestation conveyance; "none" is the only supported preference
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    #[default]
    None,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelyingPartyEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: Buffer,
    pub name: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub r#type: PublicKeyCredentialType,
    pub alg: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type", default)]
    pub r#type: PublicKeyCredentialType,
    pub id: Buffer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl PublicKeyCredentialDescriptor {
    #[must_use]
    pub fn new(id: impl Into<Buffer>) -> Self {
        Self {
            r#type: PublicKeyCredentialType::PublicKey,
            id: id.into(),
            transports: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
    /// Legacy mirror of `resident_key`; always set by the builder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
}

impl AuthenticatorSelectionCriteria {
    /// Resident key and user verification both required
    #[must_use]
    pub fn required() -> Self {
        Self {
            authenticator_attachment: None,
            resident_key: Some(ResidentKeyRequirement::Required),
            user_verification: Some(UserVerificationRequirement::Required),
            require_resident_key: None,
        }
    }
}

/// Options for `navigator.credentials.create()`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub challenge: Buffer,
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u32,
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelectionCriteria,
    pub attestation: AttestationConveyance,
}

/// Arguments to [`credential_creation_options`]; unset fields take defaults
#[derive(Clone, Debug)]
pub struct CredentialCreationArgs {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub challenge: Option<Vec<u8>>,
    pub timeout: Option<u32>,
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
}

impl CredentialCreationArgs {
    #[must_use]
    pub fn new(rp: RelyingPartyEntity, user: UserEntity) -> Self {
        Self {
            rp,
            user,
            challenge: None,
            timeout: None,
            exclude_credentials: Vec::new(),
            authenticator_selection: None,
        }
    }
}

/// Options for `navigator.credentials.get()`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    pub challenge: Buffer,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub user_verification: UserVerificationRequirement,
    pub attestation: AttestationConveyance,
}

/// Arguments to [`credential_request_options`]; unset fields take defaults
#[derive(Clone, Debug, Default)]
pub struct CredentialRequestArgs {
    pub challenge: Option<Vec<u8>>,
    pub timeout: Option<u32>,
    pub rp_id: Option<String>,
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub user_verification: Option<UserVerificationRequirement>,
}

/// Build creation options, advertising every algorithm in `policy`
///
/// # Errors
/// - `ChallengeTooShort` for a supplied challenge under 16 bytes
/// - `UserVerificationUnsupported` / `ResidentKeyUnsupported` when the
///   selection criteria ask for anything but `required`
/// - `RandomUnavailable` if a challenge must be generated and the RNG fails
pub fn credential_creation_options(
    args: CredentialCreationArgs,
    policy: &AlgorithmPolicy,
) -> Result<CredentialCreationOptions, OptionsError> {
    let challenge = challenge_or_random(args.challenge)?;

    let mut selection = args
        .authenticator_selection
        .unwrap_or_else(AuthenticatorSelectionCriteria::required);
    if selection.user_verification != Some(UserVerificationRequirement::Required) {
        return Err(OptionsError::UserVerificationUnsupported);
    }
    if selection.resident_key != Some(ResidentKeyRequirement::Required) {
        return Err(OptionsError::ResidentKeyUnsupported);
    }
    selection.require_resident_key = Some(true);

    let pub_key_cred_params = policy
        .algorithms()
        .iter()
        .map(|alg| PublicKeyCredentialParameters {
            r#type: PublicKeyCredentialType::PublicKey,
            alg: alg.id(),
        })
        .collect();

    Ok(CredentialCreationOptions {
        rp: args.rp,
        user: args.user,
        challenge: challenge.into(),
        pub_key_cred_params,
        timeout: args.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
        exclude_credentials: args.exclude_credentials,
        authenticator_selection: selection,
        attestation: AttestationConveyance::None,
    })
}

/// Build request options
///
/// # Errors
/// - `ChallengeTooShort` for a supplied challenge under 16 bytes
/// - `UserVerificationUnsupported` unless user verification is `required`
/// - `RandomUnavailable` if a challenge must be generated and the RNG fails
pub fn credential_request_options(
    args: CredentialRequestArgs,
) -> Result<CredentialRequestOptions, OptionsError> {
    let challenge = challenge_or_random(args.challenge)?;

    let user_verification = args
        .user_verification
        .unwrap_or(UserVerificationRequirement::Required);
    if user_verification != UserVerificationRequirement::Required {
        return Err(OptionsError::UserVerificationUnsupported);
    }

    Ok(CredentialRequestOptions {
        challenge: challenge.into(),
        timeout: args.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
        rp_id: args.rp_id,
        allow_credentials: args.allow_credentials,
        user_verification,
        attestation: AttestationConveyance::None,
    })
}

fn challenge_or_random(challenge: Option<Vec<u8>>) -> Result<Vec<u8>, OptionsError> {
    let challenge = match challenge {
        Some(challenge) => challenge,
        None => generate_challenge(MIN_CHALLENGE_LEN)?,
    };
    if challenge.len() < MIN_CHALLENGE_LEN {
        return Err(OptionsError::ChallengeTooShort {
            min: MIN_CHALLENGE_LEN,
            actual: challenge.len(),
        });
    }
    Ok(challenge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{base64url_decode, json_encode};
    use crate::webauthn::CoseAlgorithm;

    const CREATION_OPTIONS: &str = r#"{"rp":{"id":"localhost","name":"LocalHost!"},"user":{"id":["~b","q6urqw"],"name":"case1","displayName":"Case 1"},"challenge":["~b","q6urq6urq6urq6urq6urqw"],"pubKeyCredParams":[{"type":"public-key","alg":-7}],"timeout":300000,"excludeCredentials":[],"authenticatorSelection":{"authenticatorAttachment":"platform","residentKey":"required","userVerification":"required","requireResidentKey":true},"attestation":"none"}"#;
    const REQUEST_OPTIONS: &str = r#"{"challenge":["~b","q6urq6urq6urq6urq6urqw"],"timeout":300000,"allowCredentials":[{"type":"public-key","id":["~b","shIaRNpGuNM0BoH55SB2mr1SQxfttSnjxVRRVNgufXc"]}],"userVerification":"required","attestation":"none"}"#;

    fn creation_args() -> CredentialCreationArgs {
        CredentialCreationArgs::new(
            RelyingPartyEntity {
                id: Some("localhost".to_string()),
                name: "LocalHost!".to_string(),
            },
            UserEntity {
                id: Buffer::new(vec![0xab; 4]),
                name: "case1".to_string(),
                display_name: "Case 1".to_string(),
            },
        )
    }

    fn as_json(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_creation_options_match_browser_shape() {
        let mut args = creation_args();
        args.challenge = Some(vec![0xab; 16]);
        args.authenticator_selection = Some(AuthenticatorSelectionCriteria {
            authenticator_attachment: Some(AuthenticatorAttachment::Platform),
            ..AuthenticatorSelectionCriteria::required()
        });

        let options =
            credential_creation_options(args, &AlgorithmPolicy::new([CoseAlgorithm::Es256]))
                .unwrap();
        assert_eq!(
            as_json(&json_encode(&options).unwrap()),
            as_json(CREATION_OPTIONS)
        );
    }

    #[test]
    fn test_request_options_match_browser_shape() {
        let args = CredentialRequestArgs {
            challenge: Some(vec![0xab; 16]),
            allow_credentials: vec![PublicKeyCredentialDescriptor::new(
                base64url_decode("shIaRNpGuNM0BoH55SB2mr1SQxfttSnjxVRRVNgufXc").unwrap(),
            )],
            ..CredentialRequestArgs::default()
        };

        let options = credential_request_options(args).unwrap();
        assert_eq!(
            as_json(&json_encode(&options).unwrap()),
            as_json(REQUEST_OPTIONS)
        );
    }

    #[test]
    fn test_defaults_generate_fresh_challenge() {
        let first = credential_creation_options(creation_args(), &AlgorithmPolicy::default())
            .unwrap();
        let second = credential_creation_options(creation_args(), &AlgorithmPolicy::default())
            .unwrap();

        assert_eq!(first.challenge.len(), MIN_CHALLENGE_LEN);
        assert_ne!(first.challenge, second.challenge);
        assert_eq!(first.timeout, DEFAULT_TIMEOUT_MS);
        assert_eq!(first.authenticator_selection.require_resident_key, Some(true));
        let algs: Vec<i64> = first.pub_key_cred_params.iter().map(|p| p.alg).collect();
        assert_eq!(algs, vec![-7, -257]);
    }

    #[test]
    fn test_short_challenge_rejected() {
        let mut args = creation_args();
        args.challenge = Some(vec![1; 15]);
        assert_eq!(
            credential_creation_options(args, &AlgorithmPolicy::default()),
            Err(OptionsError::ChallengeTooShort { min: 16, actual: 15 })
        );

        let args = CredentialRequestArgs {
            challenge: Some(Vec::new()),
            ..CredentialRequestArgs::default()
        };
        assert!(matches!(
            credential_request_options(args),
            Err(OptionsError::ChallengeTooShort { .. })
        ));
    }

    #[test]
    fn test_weaker_selection_rejected() {
        let mut args = creation_args();
        args.authenticator_selection = Some(AuthenticatorSelectionCriteria {
            user_verification: Some(UserVerificationRequirement::Preferred),
            ..AuthenticatorSelectionCriteria::required()
        });
        assert_eq!(
            credential_creation_options(args, &AlgorithmPolicy::default()),
            Err(OptionsError::UserVerificationUnsupported)
        );

        let mut args = creation_args();
        args.authenticator_selection = Some(AuthenticatorSelectionCriteria {
            resident_key: None,
            ..AuthenticatorSelectionCriteria::required()
        });
        assert_eq!(
            credential_creation_options(args, &AlgorithmPolicy::default()),
            Err(OptionsError::ResidentKeyUnsupported)
        );

        let args = CredentialRequestArgs {
            user_verification: Some(UserVerificationRequirement::Discouraged),
            ..CredentialRequestArgs::default()
        };
        assert_eq!(
            credential_request_options(args),
            Err(OptionsError::UserVerificationUnsupported)
        );
    }
}
