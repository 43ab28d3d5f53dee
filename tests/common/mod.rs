// Shared builders for ceremony tests: a software authenticator that signs
// with freshly generated keys and produces the bytes a browser would send.
#![allow(dead_code)]

use ciborium::value::Value;
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{RsaPssSaltlen, Signer};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, EcdsaSigningAlgorithm, Ed25519KeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING,
    ECDSA_P384_SHA384_ASN1_SIGNING,
};

use passkey_rp::encoding::{base64url_encode, Buffer};
use passkey_rp::webauthn::crypto::sha256;
use passkey_rp::webauthn::{
    AuthenticationCredential, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    CoseAlgorithm, PublicKeyCredentialType, RegistrationCredential, StoredCredential,
};

pub const ORIGIN: &str = "https://login.example.com";
pub const RP_ID: &str = "example.com";

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_UV: u8 = 0x04;
pub const FLAG_AT: u8 = 0x40;

pub fn origins() -> Vec<String> {
    vec![ORIGIN.to_string()]
}

pub fn rps() -> Vec<String> {
    vec![RP_ID.to_string()]
}

/// Signing half of a credential key pair
pub enum TestKey {
    Ecdsa(EcdsaKeyPair, CoseAlgorithm),
    Ed25519(Ed25519KeyPair),
    P521(EcKey<Private>),
    Rsa(PKey<Private>, CoseAlgorithm),
}

impl TestKey {
    pub fn es256() -> Self {
        Self::ring_ecdsa(&ECDSA_P256_SHA256_ASN1_SIGNING, CoseAlgorithm::Es256)
    }

    pub fn es384() -> Self {
        Self::ring_ecdsa(&ECDSA_P384_SHA384_ASN1_SIGNING, CoseAlgorithm::Es384)
    }

    pub fn es512() -> Self {
        let group = EcGroup::from_curve_name(Nid::SECP521R1).unwrap();
        Self::P521(EcKey::generate(&group).unwrap())
    }

    pub fn eddsa() -> Self {
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&SystemRandom::new()).unwrap();
        Self::Ed25519(Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap())
    }

    pub fn rsa(algorithm: CoseAlgorithm) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        Self::Rsa(key, algorithm)
    }

    fn ring_ecdsa(signing: &'static EcdsaSigningAlgorithm, algorithm: CoseAlgorithm) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(signing, &rng).unwrap();
        Self::Ecdsa(
            EcdsaKeyPair::from_pkcs8(signing, pkcs8.as_ref(), &rng).unwrap(),
            algorithm,
        )
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Ecdsa(_, algorithm) | Self::Rsa(_, algorithm) => *algorithm,
            Self::Ed25519(_) => CoseAlgorithm::EdDsa,
            Self::P521(_) => CoseAlgorithm::Es512,
        }
    }

    /// CBOR-encoded `COSE_Key` for the public half
    pub fn cose_key(&self) -> Vec<u8> {
        let alg = self.algorithm().id();
        match self {
            Self::Ecdsa(pair, _) => {
                // Uncompressed SEC1 point: 0x04 || x || y
                let point = &pair.public_key().as_ref()[1..];
                let (x, y) = point.split_at(point.len() / 2);
                let crv = if alg == CoseAlgorithm::Es256.id() { 1 } else { 2 };
                cose_ec2(alg, crv, x, y)
            }
            Self::Ed25519(pair) => cose_okp(alg, 6, pair.public_key().as_ref()),
            Self::P521(key) => {
                let group = EcGroup::from_curve_name(Nid::SECP521R1).unwrap();
                let mut ctx = BigNumContext::new().unwrap();
                let mut x = BigNum::new().unwrap();
                let mut y = BigNum::new().unwrap();
                key.public_key()
                    .affine_coordinates(&group, &mut x, &mut y, &mut ctx)
                    .unwrap();
                cose_ec2(
                    alg,
                    3,
                    &x.to_vec_padded(66).unwrap(),
                    &y.to_vec_padded(66).unwrap(),
                )
            }
            Self::Rsa(key, _) => {
                let rsa = key.rsa().unwrap();
                cose_rsa(alg, &rsa.n().to_vec(), &rsa.e().to_vec())
            }
        }
    }

    /// Sign the way an authenticator does: DER for ECDSA, raw otherwise
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ecdsa(pair, _) => pair
                .sign(&SystemRandom::new(), message)
                .unwrap()
                .as_ref()
                .to_vec(),
            Self::Ed25519(pair) => pair.sign(message).as_ref().to_vec(),
            Self::P521(key) => {
                let digest = openssl::sha::sha512(message);
                EcdsaSig::sign(&digest, key).unwrap().to_der().unwrap()
            }
            Self::Rsa(key, algorithm) => {
                let (digest, pss) = match algorithm {
                    CoseAlgorithm::Rs256 => (MessageDigest::sha256(), false),
                    CoseAlgorithm::Rs384 => (MessageDigest::sha384(), false),
                    CoseAlgorithm::Rs512 => (MessageDigest::sha512(), false),
                    CoseAlgorithm::Ps256 => (MessageDigest::sha256(), true),
                    CoseAlgorithm::Ps384 => (MessageDigest::sha384(), true),
                    CoseAlgorithm::Ps512 => (MessageDigest::sha512(), true),
                    other => panic!("{other} is not an RSA algorithm"),
                };
                let mut signer = Signer::new(digest, key).unwrap();
                if pss {
                    signer.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
                    signer
                        .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
                        .unwrap();
                    signer.set_rsa_mgf1_md(digest).unwrap();
                }
                signer.sign_oneshot_to_vec(message).unwrap()
            }
        }
    }
}

fn int(v: i64) -> Value {
    Value::Integer(v.into())
}

pub fn encode_cbor(value: &Value) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).unwrap();
    bytes
}

pub fn cose_ec2(alg: i64, crv: i64, x: &[u8], y: &[u8]) -> Vec<u8> {
    encode_cbor(&Value::Map(vec![
        (int(1), int(2)),
        (int(3), int(alg)),
        (int(-1), int(crv)),
        (int(-2), Value::Bytes(x.to_vec())),
        (int(-3), Value::Bytes(y.to_vec())),
    ]))
}

pub fn cose_okp(alg: i64, crv: i64, x: &[u8]) -> Vec<u8> {
    encode_cbor(&Value::Map(vec![
        (int(1), int(1)),
        (int(3), int(alg)),
        (int(-1), int(crv)),
        (int(-2), Value::Bytes(x.to_vec())),
    ]))
}

pub fn cose_rsa(alg: i64, n: &[u8], e: &[u8]) -> Vec<u8> {
    encode_cbor(&Value::Map(vec![
        (int(1), int(3)),
        (int(3), int(alg)),
        (int(-1), Value::Bytes(n.to_vec())),
        (int(-2), Value::Bytes(e.to_vec())),
    ]))
}

/// Authenticator data; attested credential data is appended when given
pub fn authenticator_data(
    rp_id: &str,
    flags: u8,
    sign_count: u32,
    attested: Option<(&[u8], &[u8])>,
) -> Vec<u8> {
    let mut data = sha256(rp_id.as_bytes());
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    if let Some((credential_id, cose_key)) = attested {
        data.extend_from_slice(&[0u8; 16]);
        let len = u16::try_from(credential_id.len()).unwrap();
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(credential_id);
        data.extend_from_slice(cose_key);
    }
    data
}

pub fn client_data(ty: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": ty,
        "challenge": base64url_encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    }))
    .unwrap()
}

pub fn attestation_object(fmt: &str, auth_data: &[u8]) -> Vec<u8> {
    encode_cbor(&Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), Value::Map(Vec::new())),
        (Value::Text("authData".into()), Value::Bytes(auth_data.to_vec())),
    ]))
}

/// Software authenticator holding one credential
pub struct Authenticator {
    pub key: TestKey,
    pub credential_id: Vec<u8>,
    pub user_id: Vec<u8>,
    pub rp_id: String,
    pub origin: String,
}

impl Authenticator {
    pub fn new(key: TestKey) -> Self {
        Self {
            key,
            credential_id: (0u8..32).collect(),
            user_id: vec![0x42; 8],
            rp_id: RP_ID.to_string(),
            origin: ORIGIN.to_string(),
        }
    }

    pub fn register(&self, challenge: &[u8]) -> RegistrationCredential {
        self.register_with(challenge, FLAG_UP | FLAG_UV | FLAG_AT, "none")
    }

    pub fn register_with(&self, challenge: &[u8], flags: u8, fmt: &str) -> RegistrationCredential {
        let cose_key = self.key.cose_key();
        let auth_data = authenticator_data(
            &self.rp_id,
            flags,
            0,
            Some((self.credential_id.as_slice(), cose_key.as_slice())),
        );
        RegistrationCredential {
            r#type: PublicKeyCredentialType::PublicKey,
            raw_id: Buffer::new(self.credential_id.clone()),
            response: AuthenticatorAttestationResponse {
                client_data_json: Buffer::new(client_data(
                    "webauthn.create",
                    challenge,
                    &self.origin,
                )),
                attestation_object: Buffer::new(attestation_object(fmt, &auth_data)),
            },
        }
    }

    pub fn assert(&self, challenge: &[u8], sign_count: u32) -> AuthenticationCredential {
        self.assert_with(challenge, sign_count, FLAG_UP | FLAG_UV)
    }

    pub fn assert_with(
        &self,
        challenge: &[u8],
        sign_count: u32,
        flags: u8,
    ) -> AuthenticationCredential {
        let auth_data = authenticator_data(&self.rp_id, flags, sign_count, None);
        let client_data_json = client_data("webauthn.get", challenge, &self.origin);

        let mut message = auth_data.clone();
        message.extend_from_slice(&sha256(&client_data_json));

        AuthenticationCredential {
            r#type: PublicKeyCredentialType::PublicKey,
            raw_id: Buffer::new(self.credential_id.clone()),
            response: AuthenticatorAssertionResponse {
                client_data_json: Buffer::new(client_data_json),
                authenticator_data: Buffer::new(auth_data),
                signature: Buffer::new(self.key.sign(&message)),
                user_handle: Some(Buffer::new(self.user_id.clone())),
            },
        }
    }

    pub fn stored(&self, sign_count: u32) -> StoredCredential {
        StoredCredential {
            user_id: Buffer::new(self.user_id.clone()),
            public_key: Buffer::new(self.key.cose_key()),
            sign_count,
        }
    }
}
