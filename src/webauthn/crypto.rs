//! `WebAuthn` cryptography operations
//!
//! Signature verification for every supported COSE algorithm, plus digest
//! and challenge helpers.
//!
//! - ECDSA P-256 / P-384 and Ed25519 verify through `ring`.
//! - ECDSA P-521 verifies through `openssl`, which `ring` does not cover.
//!   `openssl` also validates every EC public point before use.
//! - RSASSA-PKCS1-v1.5 and RSASSA-PSS verify through `rsa` with `sha2` digests.
//!
//! A signature that simply does not verify yields `Ok(false)`. Errors are
//! reserved for malformed keys and malformed signatures.

use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkey::Public;
use ring::digest;
use ring::rand::SecureRandom;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::cose::{AlgorithmPolicy, CoseAlgorithm, CoseCurve, CoseKey};
use super::errors::{OptionsError, VerificationError};

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;
const ED25519_KEY_LEN: usize = 32;
const ED25519_SIGNATURE_LEN: usize = 64;

/// Generate `len` bytes of secure random data
///
/// # Errors
/// Returns `OptionsError::RandomUnavailable` if the system RNG fails.
pub fn generate_challenge(len: usize) -> Result<Vec<u8>, OptionsError> {
    let mut bytes = vec![0u8; len];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| OptionsError::RandomUnavailable)?;
    Ok(bytes)
}

/// Hash data using SHA-256
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Verify `signature` over `message` with a CBOR-encoded `COSE_Key`
///
/// # Errors
/// - any COSE key decoding error (including algorithms outside `policy`)
/// - `InvalidKeyMaterial` if the key cannot be imported
/// - `SignatureFormatError` if the signature is structurally malformed
pub fn verify_signature(
    cose_key: &[u8],
    message: &[u8],
    signature: &[u8],
    policy: &AlgorithmPolicy,
) -> Result<bool, VerificationError> {
    let key = CoseKey::from_bytes(cose_key, policy)?;
    verify_with_key(&key, message, signature)
}

/// Verify `signature` over `message` with a decoded key
///
/// # Errors
/// See [`verify_signature`].
pub fn verify_with_key(
    key: &CoseKey,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, VerificationError> {
    match key {
        CoseKey::Ec2 {
            algorithm,
            curve,
            x,
            y,
        } => verify_ecdsa(*algorithm, *curve, x, y, message, signature),
        CoseKey::Okp {
            algorithm: CoseAlgorithm::EdDsa,
            x,
            ..
        } => verify_eddsa(x, message, signature),
        CoseKey::Okp { algorithm, .. } => Err(mismatched_key(*algorithm, "OKP")),
        CoseKey::Rsa { algorithm, n, e } => verify_rsa(*algorithm, n, e, message, signature),
    }
}

fn verify_ecdsa(
    algorithm: CoseAlgorithm,
    curve: CoseCurve,
    x: &[u8],
    y: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, VerificationError> {
    let expected_curve = match algorithm {
        CoseAlgorithm::Es256 => CoseCurve::P256,
        CoseAlgorithm::Es384 => CoseCurve::P384,
        CoseAlgorithm::Es512 => CoseCurve::P521,
        other => return Err(mismatched_key(other, "EC2")),
    };
    if curve != expected_curve {
        return Err(VerificationError::InvalidKeyMaterial(format!(
            "{algorithm} requires {expected_curve}, key is on {curve}"
        )));
    }

    let field_size = curve.field_size();
    if x.len() != field_size || y.len() != field_size {
        return Err(VerificationError::InvalidKeyMaterial(format!(
            "{curve} coordinates must be {field_size} bytes"
        )));
    }

    let ec_key = import_ec_key(curve, x, y)?;
    let raw = der_to_raw(signature, field_size)?;

    Ok(match algorithm {
        CoseAlgorithm::Es256 => verify_ring(
            &signature::ECDSA_P256_SHA256_FIXED,
            &sec1_point(x, y),
            message,
            &raw,
        ),
        CoseAlgorithm::Es384 => verify_ring(
            &signature::ECDSA_P384_SHA384_FIXED,
            &sec1_point(x, y),
            message,
            &raw,
        ),
        _ => verify_p521(&ec_key, message, &raw)?,
    })
}

fn verify_eddsa(x: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, VerificationError> {
    if x.len() != ED25519_KEY_LEN {
        return Err(VerificationError::InvalidKeyMaterial(format!(
            "Ed25519 public key must be {ED25519_KEY_LEN} bytes"
        )));
    }
    if signature.len() != ED25519_SIGNATURE_LEN {
        return Err(VerificationError::SignatureFormatError(
            "Ed25519 signature must be 64 bytes",
        ));
    }
    Ok(verify_ring(&signature::ED25519, x, message, signature))
}

fn verify_rsa(
    algorithm: CoseAlgorithm,
    n: &[u8],
    e: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, VerificationError> {
    let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
        .map_err(|err| VerificationError::InvalidKeyMaterial(err.to_string()))?;

    // PSS salt length equals the hash output length.
    let outcome = match algorithm {
        CoseAlgorithm::Rs256 => key.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(message), signature),
        CoseAlgorithm::Rs384 => key.verify(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(message), signature),
        CoseAlgorithm::Rs512 => key.verify(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(message), signature),
        CoseAlgorithm::Ps256 => key.verify(Pss::new_with_salt::<Sha256>(32), &Sha256::digest(message), signature),
        CoseAlgorithm::Ps384 => key.verify(Pss::new_with_salt::<Sha384>(48), &Sha384::digest(message), signature),
        CoseAlgorithm::Ps512 => key.verify(Pss::new_with_salt::<Sha512>(64), &Sha512::digest(message), signature),
        other => return Err(mismatched_key(other, "RSA")),
    };
    Ok(outcome.is_ok())
}

fn verify_ring(
    algorithm: &'static dyn VerificationAlgorithm,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> bool {
    UnparsedPublicKey::new(algorithm, public_key)
        .verify(message, signature)
        .is_ok()
}

fn verify_p521(ec_key: &EcKey<Public>, message: &[u8], raw: &[u8]) -> Result<bool, VerificationError> {
    let (r, s) = raw.split_at(raw.len() / 2);
    let signature = ecdsa_sig(r, s)
        .map_err(|_| VerificationError::SignatureFormatError("invalid ECDSA scalar"))?;
    Ok(signature
        .verify(&Sha512::digest(message), ec_key)
        .unwrap_or(false))
}

fn ecdsa_sig(r: &[u8], s: &[u8]) -> Result<EcdsaSig, ErrorStack> {
    EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)
}

/// Import and validate an EC public point
fn import_ec_key(curve: CoseCurve, x: &[u8], y: &[u8]) -> Result<EcKey<Public>, VerificationError> {
    let nid = match curve {
        CoseCurve::P256 => Nid::X9_62_PRIME256V1,
        CoseCurve::P384 => Nid::SECP384R1,
        CoseCurve::P521 => Nid::SECP521R1,
        CoseCurve::Ed25519 => {
            return Err(VerificationError::InvalidKeyMaterial(
                "Ed25519 is not an ECDSA curve".to_string(),
            ))
        }
    };
    let group = EcGroup::from_curve_name(nid).map_err(key_error)?;
    let x = BigNum::from_slice(x).map_err(key_error)?;
    let y = BigNum::from_slice(y).map_err(key_error)?;
    EcKey::from_public_key_affine_coordinates(&group, &x, &y).map_err(key_error)
}

fn key_error(err: ErrorStack) -> VerificationError {
    VerificationError::InvalidKeyMaterial(err.to_string())
}

fn mismatched_key(algorithm: CoseAlgorithm, key_type: &str) -> VerificationError {
    VerificationError::InvalidKeyMaterial(format!(
        "{algorithm} cannot be used with an {key_type} key"
    ))
}

/// Uncompressed SEC1 point: 0x04 || x || y
fn sec1_point(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut point = Vec::with_capacity(1 + x.len() + y.len());
    point.push(0x04);
    point.extend_from_slice(x);
    point.extend_from_slice(y);
    point
}

/// Convert an ASN.1 DER `ECDSA-Sig-Value` into fixed-width `r || s`
///
/// Each integer may carry a leading zero byte (sign padding); shorter
/// integers are left-padded to `field_size`.
///
/// # Errors
/// Returns `SignatureFormatError` for anything but a single well-formed
/// `SEQUENCE { INTEGER r, INTEGER s }` whose integers fit `field_size` bytes.
pub fn der_to_raw(der: &[u8], field_size: usize) -> Result<Vec<u8>, VerificationError> {
    let (body, rest) = read_tlv(der, DER_SEQUENCE)?;
    if !rest.is_empty() {
        return Err(VerificationError::SignatureFormatError(
            "trailing bytes after DER signature",
        ));
    }

    let (r, body) = read_tlv(body, DER_INTEGER)?;
    let (s, body) = read_tlv(body, DER_INTEGER)?;
    if !body.is_empty() {
        return Err(VerificationError::SignatureFormatError(
            "trailing bytes inside DER sequence",
        ));
    }

    let mut raw = vec![0u8; 2 * field_size];
    let (r_out, s_out) = raw.split_at_mut(field_size);
    write_scalar(r, r_out)?;
    write_scalar(s, s_out)?;
    Ok(raw)
}

/// Read one tag-length-value, returning (value, remainder)
fn read_tlv(input: &[u8], tag: u8) -> Result<(&[u8], &[u8]), VerificationError> {
    let truncated = VerificationError::SignatureFormatError("truncated DER signature");

    let (&actual_tag, rest) = input.split_first().ok_or_else(|| truncated.clone())?;
    if actual_tag != tag {
        return Err(VerificationError::SignatureFormatError("unexpected DER tag"));
    }

    let (&first, rest) = rest.split_first().ok_or_else(|| truncated.clone())?;
    let (len, rest) = match first {
        0x00..=0x7f => (usize::from(first), rest),
        0x81 => {
            let (&len, rest) = rest.split_first().ok_or_else(|| truncated.clone())?;
            if len < 0x80 {
                return Err(VerificationError::SignatureFormatError(
                    "non-minimal DER length",
                ));
            }
            (usize::from(len), rest)
        }
        _ => {
            return Err(VerificationError::SignatureFormatError(
                "unsupported DER length",
            ))
        }
    };

    if rest.len() < len {
        return Err(truncated);
    }
    Ok(rest.split_at(len))
}

fn write_scalar(int: &[u8], out: &mut [u8]) -> Result<(), VerificationError> {
    let Some(&first) = int.first() else {
        return Err(VerificationError::SignatureFormatError("empty DER integer"));
    };
    if first & 0x80 != 0 {
        return Err(VerificationError::SignatureFormatError(
            "negative DER integer",
        ));
    }

    let start = int.iter().position(|&b| b != 0).unwrap_or(int.len());
    let magnitude = &int[start..];
    if magnitude.len() > out.len() {
        return Err(VerificationError::SignatureFormatError(
            "DER integer exceeds curve field size",
        ));
    }

    let offset = out.len() - magnitude.len();
    out[offset..].copy_from_slice(magnitude);
    Ok(())
}
