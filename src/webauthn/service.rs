//! `WebAuthn` service implementation
//!
//! Binds a validated relying-party configuration to the ceremony option
//! builders and the two verifiers.

use log::info;

use super::assertion;
use super::attestation;
use super::cose::AlgorithmPolicy;
use super::errors::{OptionsError, SettingsError, VerificationError};
use super::options::{
    credential_creation_options, credential_request_options, AuthenticatorSelectionCriteria,
    CredentialCreationArgs, CredentialCreationOptions, CredentialRequestArgs,
    CredentialRequestOptions, PublicKeyCredentialDescriptor, RelyingPartyEntity, UserEntity,
};
use super::settings::WebAuthnSettings;
use super::types::{
    AuthenticationCredential, AuthenticationResult, RegistrationCredential, RegistrationResult,
    StoredCredential,
};

/// Core `WebAuthn` service
///
/// Holds no per-ceremony state. The caller keeps the challenge from the
/// options it sent and the stored credential; both are passed back in at
/// verification time.
#[derive(Debug, Clone)]
pub struct WebAuthnService {
    settings: WebAuthnSettings,
    policy: AlgorithmPolicy,
}

impl WebAuthnService {
    /// Create a new `WebAuthnService` with the given settings
    ///
    /// # Errors
    /// Returns a `SettingsError` if the settings fail validation.
    pub fn new(settings: WebAuthnSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let policy = settings.policy()?;
        info!(
            "WebAuthn relying party {} accepting {:?}",
            settings.rp_id,
            policy.algorithms()
        );
        Ok(Self { settings, policy })
    }

    #[must_use]
    pub fn settings(&self) -> &WebAuthnSettings {
        &self.settings
    }

    #[must_use]
    pub fn policy(&self) -> &AlgorithmPolicy {
        &self.policy
    }

    /// Create registration options for a new credential
    ///
    /// The returned options carry a fresh challenge; the caller must keep it
    /// for [`Self::verify_registration`].
    ///
    /// # Errors
    /// Returns `OptionsError::RandomUnavailable` if no challenge can be
    /// generated.
    pub fn start_registration(
        &self,
        user: UserEntity,
        exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    ) -> Result<CredentialCreationOptions, OptionsError> {
        let mut args = CredentialCreationArgs::new(
            RelyingPartyEntity {
                id: Some(self.settings.rp_id.clone()),
                name: self.settings.rp_name.clone(),
            },
            user,
        );
        args.timeout = Some(self.settings.timeout_ms);
        args.exclude_credentials = exclude_credentials;
        args.authenticator_selection = Some(AuthenticatorSelectionCriteria {
            authenticator_attachment: self.settings.authenticator_attachment,
            ..AuthenticatorSelectionCriteria::required()
        });

        credential_creation_options(args, &self.policy)
    }

    /// Create authentication options
    ///
    /// An empty `allow_credentials` lets the authenticator pick a
    /// discoverable credential.
    ///
    /// # Errors
    /// Returns `OptionsError::RandomUnavailable` if no challenge can be
    /// generated.
    pub fn start_authentication(
        &self,
        allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    ) -> Result<CredentialRequestOptions, OptionsError> {
        credential_request_options(CredentialRequestArgs {
            timeout: Some(self.settings.timeout_ms),
            rp_id: Some(self.settings.rp_id.clone()),
            allow_credentials,
            ..CredentialRequestArgs::default()
        })
    }

    /// Verify a registration response against the challenge that was sent
    ///
    /// # Errors
    /// Returns the `VerificationError` of the first failed check.
    pub fn verify_registration(
        &self,
        credential: &RegistrationCredential,
        expected_challenge: &[u8],
    ) -> Result<RegistrationResult, VerificationError> {
        attestation::verify_registration(
            credential,
            expected_challenge,
            &self.settings.allowed_origins,
            &self.settings.allowed_rps,
            &self.policy,
        )
    }

    /// Verify an authentication response for a stored credential
    ///
    /// # Errors
    /// Returns the `VerificationError` of the first failed check.
    pub fn verify_authentication(
        &self,
        credential: &AuthenticationCredential,
        expected_challenge: &[u8],
        stored: &StoredCredential,
    ) -> Result<AuthenticationResult, VerificationError> {
        assertion::verify_authentication(
            credential,
            expected_challenge,
            &self.settings.allowed_origins,
            &self.settings.allowed_rps,
            stored,
            &self.policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Buffer;
    use crate::webauthn::options::AuthenticatorAttachment;

    fn service() -> WebAuthnService {
        WebAuthnService::new(WebAuthnSettings {
            rp_id: "example.com".to_string(),
            rp_name: "Example".to_string(),
            allowed_origins: vec!["https://example.com".to_string()],
            allowed_rps: vec!["example.com".to_string()],
            algorithms: vec!["ES256".to_string(), "EdDSA".to_string()],
            timeout_ms: 60_000,
            authenticator_attachment: Some(AuthenticatorAttachment::CrossPlatform),
        })
        .unwrap()
    }

    fn user() -> UserEntity {
        UserEntity {
            id: Buffer::new(vec![7; 8]),
            name: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = WebAuthnSettings {
            allowed_origins: vec!["http://example.com".to_string()],
            ..WebAuthnSettings::default()
        };
        assert!(matches!(
            WebAuthnService::new(settings),
            Err(SettingsError::InsecureOrigin(_))
        ));
    }

    #[test]
    fn test_start_registration_uses_settings() {
        let options = service().start_registration(user(), Vec::new()).unwrap();
        assert_eq!(options.rp.id.as_deref(), Some("example.com"));
        assert_eq!(options.rp.name, "Example");
        assert_eq!(options.timeout, 60_000);
        assert_eq!(
            options.authenticator_selection.authenticator_attachment,
            Some(AuthenticatorAttachment::CrossPlatform)
        );
        let algs: Vec<i64> = options.pub_key_cred_params.iter().map(|p| p.alg).collect();
        assert_eq!(algs, vec![-7, -8]);
    }

    #[test]
    fn test_start_authentication_uses_settings() {
        let options = service()
            .start_authentication(vec![PublicKeyCredentialDescriptor::new(vec![1, 2, 3])])
            .unwrap();
        assert_eq!(options.rp_id.as_deref(), Some("example.com"));
        assert_eq!(options.timeout, 60_000);
        assert_eq!(options.allow_credentials.len(), 1);
        assert_eq!(options.challenge.len(), 16);
    }
}
