//! CBOR processing for `WebAuthn`
//!
//! This module handles the CBOR (Concise Binary Object Representation)
//! processing needed for `WebAuthn` attestation objects, plus the small map
//! lookups shared with COSE key decoding.

use ciborium::de::from_reader;
use ciborium::value::Value;

use super::authenticator_data::AuthenticatorData;
use super::errors::VerificationError;

/// The only attestation statement format accepted
pub const ATTESTATION_FORMAT_NONE: &str = "none";

/// Find the value stored under an integer label
pub(crate) fn int_entry(map: &[(Value, Value)], label: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| k.as_integer().and_then(|i| i64::try_from(i).ok()) == Some(label))
        .map(|(_, v)| v)
}

/// Find the value stored under a text key
pub(crate) fn text_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

/// Decoded attestation object (`{fmt, attStmt, authData}`)
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: String,
    /// Not interpreted; "none" attestation carries an empty map
    pub att_stmt: Value,
    pub auth_data: AuthenticatorData,
}

impl AttestationObject {
    /// Decode an attestation object and parse its authenticator data
    ///
    /// # Errors
    /// - `MalformedAttestationObject` if the bytes are not a CBOR map with a
    ///   text `fmt` and a byte-string `authData`
    /// - `AttestationFormatUnsupported` if `fmt` is anything but "none"
    /// - any authenticator data parse error
    pub fn decode(bytes: &[u8]) -> Result<Self, VerificationError> {
        let attestation: Value = from_reader(bytes).map_err(|e| {
            VerificationError::MalformedAttestationObject(format!("invalid CBOR: {e}"))
        })?;

        let Some(map) = attestation.as_map() else {
            return Err(VerificationError::MalformedAttestationObject(
                "attestation object is not a map".to_string(),
            ));
        };

        let Some(fmt) = text_entry(map, "fmt").and_then(Value::as_text) else {
            return Err(VerificationError::MalformedAttestationObject(
                "missing fmt".to_string(),
            ));
        };

        if fmt != ATTESTATION_FORMAT_NONE {
            return Err(VerificationError::AttestationFormatUnsupported(
                fmt.to_string(),
            ));
        }

        let Some(auth_data) = text_entry(map, "authData").and_then(Value::as_bytes) else {
            return Err(VerificationError::MalformedAttestationObject(
                "missing authData".to_string(),
            ));
        };

        let att_stmt = text_entry(map, "attStmt")
            .cloned()
            .unwrap_or(Value::Map(Vec::new()));

        Ok(Self {
            fmt: fmt.to_string(),
            att_stmt,
            auth_data: AuthenticatorData::parse(auth_data)?,
        })
    }
}
