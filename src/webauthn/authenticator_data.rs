//! Authenticator data parsing
//!
//! Layout (big-endian multi-byte fields):
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter
//! - attested credential data, only when the AT flag is set:
//!   - 16 bytes: AAGUID
//!   - 2 bytes: credential ID length (L)
//!   - L bytes: credential ID
//!   - remainder: CBOR-encoded COSE public key

use super::errors::VerificationError;

pub const RP_ID_HASH_LEN: usize = 32;
const FLAGS_OFFSET: usize = 32;
const SIGN_COUNT_OFFSET: usize = 33;
const AAGUID_OFFSET: usize = 37;
const CREDENTIAL_ID_LEN_OFFSET: usize = 53;
const CREDENTIAL_ID_OFFSET: usize = 55;

/// Minimum length: RP ID hash + flags + counter
pub const MIN_AUTHENTICATOR_DATA_LEN: usize = 37;

/// Longest credential ID a relying party accepts at registration
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// Flags byte; bits other than UP, UV and AT are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticatorFlags {
    pub user_present: bool,
    pub user_verified: bool,
    pub attested_data_included: bool,
}

impl AuthenticatorFlags {
    const UP: u8 = 0b0000_0001;
    const UV: u8 = 0b0000_0100;
    const AT: u8 = 0b0100_0000;

    #[must_use]
    pub fn from_byte(flags: u8) -> Self {
        Self {
            user_present: flags & Self::UP != 0,
            user_verified: flags & Self::UV != 0,
            attested_data_included: flags & Self::AT != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    /// CBOR-encoded `COSE_Key`
    pub credential_public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    /// Present if and only if the AT flag is set
    pub attested_credential_data: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse authenticator data bytes
    ///
    /// # Errors
    /// Returns `TruncatedAuthenticatorData` if the buffer is shorter than the
    /// fixed header, or if the AT flag is set and the attested credential
    /// data does not fit.
    pub fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        ensure_len(bytes, MIN_AUTHENTICATOR_DATA_LEN)?;

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);

        let flags = AuthenticatorFlags::from_byte(bytes[FLAGS_OFFSET]);
        let sign_count = u32::from_be_bytes([
            bytes[SIGN_COUNT_OFFSET],
            bytes[SIGN_COUNT_OFFSET + 1],
            bytes[SIGN_COUNT_OFFSET + 2],
            bytes[SIGN_COUNT_OFFSET + 3],
        ]);

        let attested_credential_data = if flags.attested_data_included {
            Some(parse_attested_credential_data(bytes)?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
        })
    }
}

fn parse_attested_credential_data(bytes: &[u8]) -> Result<AttestedCredentialData, VerificationError> {
    ensure_len(bytes, CREDENTIAL_ID_OFFSET)?;

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&bytes[AAGUID_OFFSET..CREDENTIAL_ID_LEN_OFFSET]);

    let id_len = usize::from(u16::from_be_bytes([
        bytes[CREDENTIAL_ID_LEN_OFFSET],
        bytes[CREDENTIAL_ID_LEN_OFFSET + 1],
    ]));
    let id_end = CREDENTIAL_ID_OFFSET + id_len;

    // At least one byte of public key must follow the credential ID.
    ensure_len(bytes, id_end + 1)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id: bytes[CREDENTIAL_ID_OFFSET..id_end].to_vec(),
        credential_public_key: bytes[id_end..].to_vec(),
    })
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), VerificationError> {
    if bytes.len() < expected {
        return Err(VerificationError::TruncatedAuthenticatorData {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
