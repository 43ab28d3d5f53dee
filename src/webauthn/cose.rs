//! COSE key decoding
//!
//! Turns a `COSE_Key` map (RFC 9052) taken from attested credential data into
//! a typed [`CoseKey`]. The algorithm label is checked against the configured
//! [`AlgorithmPolicy`] before any other field is looked at. Building a native
//! verification key is left to the crypto module.

use std::fmt;
use std::str::FromStr;

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use super::cbor;
use super::errors::{SettingsError, VerificationError};

// COSE_Key common parameter labels
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;

// Key type specific parameter labels
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;
const LABEL_RSA_N: i64 = -1;
const LABEL_RSA_E: i64 = -2;

/// Signature algorithms from the IANA COSE Algorithms registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoseAlgorithm {
    #[serde(rename = "ES256")]
    Es256,
    #[serde(rename = "ES384")]
    Es384,
    #[serde(rename = "ES512")]
    Es512,
    #[serde(rename = "PS256")]
    Ps256,
    #[serde(rename = "PS384")]
    Ps384,
    #[serde(rename = "PS512")]
    Ps512,
    #[serde(rename = "RS256")]
    Rs256,
    #[serde(rename = "RS384")]
    Rs384,
    #[serde(rename = "RS512")]
    Rs512,
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl CoseAlgorithm {
    pub const ALL: [Self; 10] = [
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::EdDsa,
    ];

    /// COSE algorithm identifier
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::Ps256 => -37,
            Self::Ps384 => -38,
            Self::Ps512 => -39,
            Self::Rs256 => -257,
            Self::Rs384 => -258,
            Self::Rs512 => -259,
            Self::EdDsa => -8,
        }
    }

    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.id() == id)
    }

    /// JOSE-style name ("ES256", "EdDSA", ...)
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::EdDsa => "EdDSA",
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoseAlgorithm {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingsError::UnknownAlgorithm(s.to_string()))
    }
}

/// Elliptic curves from the IANA COSE Elliptic Curves registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseCurve {
    P256,
    P384,
    P521,
    Ed25519,
}

impl CoseCurve {
    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::P256),
            2 => Some(Self::P384),
            3 => Some(Self::P521),
            6 => Some(Self::Ed25519),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::P256 => 1,
            Self::P384 => 2,
            Self::P521 => 3,
            Self::Ed25519 => 6,
        }
    }

    /// Byte length of a coordinate / scalar on this curve
    #[must_use]
    pub fn field_size(self) -> usize {
        match self {
            Self::P256 | Self::Ed25519 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    fn is_nist(self) -> bool {
        !matches!(self, Self::Ed25519)
    }
}

impl fmt::Display for CoseCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::Ed25519 => "Ed25519",
        })
    }
}

/// Immutable allow-list of signature algorithms accepted by a relying party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmPolicy {
    allowed: Vec<CoseAlgorithm>,
}

impl AlgorithmPolicy {
    /// Build a policy from a list of algorithms, keeping the first occurrence
    /// of each in order
    #[must_use]
    pub fn new(algorithms: impl IntoIterator<Item = CoseAlgorithm>) -> Self {
        let mut allowed = Vec::new();
        for alg in algorithms {
            if !allowed.contains(&alg) {
                allowed.push(alg);
            }
        }
        Self { allowed }
    }

    #[must_use]
    pub fn allows(&self, algorithm: CoseAlgorithm) -> bool {
        self.allowed.contains(&algorithm)
    }

    /// Allowed algorithms in preference order
    #[must_use]
    pub fn algorithms(&self) -> &[CoseAlgorithm] {
        &self.allowed
    }
}

impl Default for AlgorithmPolicy {
    fn default() -> Self {
        Self::new([CoseAlgorithm::Es256, CoseAlgorithm::Rs256])
    }
}

/// Decoded credential public key
///
/// Coordinates and RSA parameters are kept as the big-endian byte strings
/// found in the `COSE_Key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    /// Octet key pair (kty 1)
    Okp {
        algorithm: CoseAlgorithm,
        curve: CoseCurve,
        x: Vec<u8>,
    },
    /// Double-coordinate elliptic curve key (kty 2)
    Ec2 {
        algorithm: CoseAlgorithm,
        curve: CoseCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    /// RSA key (kty 3)
    Rsa {
        algorithm: CoseAlgorithm,
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl CoseKey {
    /// Decode CBOR-encoded `COSE_Key` bytes
    ///
    /// # Errors
    /// Returns `MalformedKeyField` if the bytes are not a CBOR map, and any
    /// error of [`CoseKey::from_value`].
    pub fn from_bytes(bytes: &[u8], policy: &AlgorithmPolicy) -> Result<Self, VerificationError> {
        let value: Value = ciborium::de::from_reader(bytes)
            .map_err(|_| VerificationError::MalformedKeyField("COSE_Key"))?;
        Self::from_value(&value, policy)
    }

    /// Decode an already CBOR-decoded `COSE_Key` map
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the algorithm is unknown or not allowed
    /// - `UnsupportedKeyType` for key types other than OKP, EC2 and RSA
    /// - `InvalidCurve` for curves that do not fit the key type
    /// - `MalformedKeyField` for missing, mistyped or empty parameters
    pub fn from_value(value: &Value, policy: &AlgorithmPolicy) -> Result<Self, VerificationError> {
        let map = value
            .as_map()
            .ok_or(VerificationError::MalformedKeyField("COSE_Key"))?;

        // The algorithm bounds which of the remaining fields mean anything.
        let alg_id = cbor::int_entry(map, LABEL_ALG)
            .and_then(cbor::as_i64)
            .ok_or(VerificationError::MalformedKeyField("alg"))?;
        let algorithm = CoseAlgorithm::from_id(alg_id)
            .filter(|alg| policy.allows(*alg))
            .ok_or(VerificationError::UnsupportedAlgorithm(alg_id))?;

        let kty = cbor::int_entry(map, LABEL_KTY)
            .and_then(cbor::as_i64)
            .ok_or(VerificationError::MalformedKeyField("kty"))?;

        match kty {
            1 => {
                let curve = curve_param(map)?;
                if curve != CoseCurve::Ed25519 {
                    return Err(VerificationError::InvalidCurve(curve.id()));
                }
                Ok(Self::Okp {
                    algorithm,
                    curve,
                    x: bytes_param(map, LABEL_X, "x")?,
                })
            }
            2 => {
                let curve = curve_param(map)?;
                if !curve.is_nist() {
                    return Err(VerificationError::InvalidCurve(curve.id()));
                }
                Ok(Self::Ec2 {
                    algorithm,
                    curve,
                    x: bytes_param(map, LABEL_X, "x")?,
                    y: bytes_param(map, LABEL_Y, "y")?,
                })
            }
            3 => Ok(Self::Rsa {
                algorithm,
                n: bytes_param(map, LABEL_RSA_N, "n")?,
                e: bytes_param(map, LABEL_RSA_E, "e")?,
            }),
            other => Err(VerificationError::UnsupportedKeyType(other)),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Okp { algorithm, .. } | Self::Ec2 { algorithm, .. } | Self::Rsa { algorithm, .. } => {
                *algorithm
            }
        }
    }
}

fn curve_param(map: &[(Value, Value)]) -> Result<CoseCurve, VerificationError> {
    let crv = cbor::int_entry(map, LABEL_CRV)
        .and_then(cbor::as_i64)
        .ok_or(VerificationError::MalformedKeyField("crv"))?;
    CoseCurve::from_id(crv).ok_or(VerificationError::InvalidCurve(crv))
}

fn bytes_param(
    map: &[(Value, Value)],
    label: i64,
    name: &'static str,
) -> Result<Vec<u8>, VerificationError> {
    match cbor::int_entry(map, label).and_then(Value::as_bytes) {
        Some(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
        _ => Err(VerificationError::MalformedKeyField(name)),
    }
}
