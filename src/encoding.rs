//! Transport encoding for ceremony payloads
//!
//! Byte buffers cross the JSON boundary between browser and relying party as
//! the two-element array `["~b", <base64url>]`. [`Buffer`] gives serde types
//! that representation at any nesting depth, and [`TransportValue`] performs
//! the same revive/replace passes over untyped JSON.
//!
//! Nothing in this module is consulted by the verification core, which only
//! ever sees already-decoded byte slices.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::{self, DeserializeOwned, IgnoredAny, SeqAccess, Unexpected, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// First element of every encoded byte buffer
pub const BYTES_MARKER: &str = "~b";

/// Transport encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid base64url data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode bytes as unpadded base64url
#[must_use]
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url text, tolerating trailing padding
///
/// # Errors
/// Returns `EncodingError::Base64` if the text contains characters outside the
/// URL-safe alphabet or has an impossible length.
pub fn base64url_decode(text: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(URL_SAFE_NO_PAD.decode(text.trim_end_matches('='))?)
}

/// Serialize any value to JSON text, with [`Buffer`] fields marked
///
/// # Errors
/// Returns `EncodingError::Json` if serialization fails.
pub fn json_encode<T: Serialize>(value: &T) -> Result<String, EncodingError> {
    Ok(serde_json::to_string(value)?)
}

/// Deserialize JSON text produced by [`json_encode`] (or the browser glue)
///
/// # Errors
/// Returns `EncodingError::Json` if the text is not valid JSON for `T`,
/// including marker arrays whose payload is not valid base64url.
pub fn json_decode<T: DeserializeOwned>(text: &str) -> Result<T, EncodingError> {
    Ok(serde_json::from_str(text)?)
}

/// Owned byte buffer serialized as `["~b", <base64url>]`
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer(Vec<u8>);

impl Buffer {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", base64url_encode(&self.0))
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Buffer> for Vec<u8> {
    fn from(buffer: Buffer) -> Self {
        buffer.0
    }
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(BYTES_MARKER)?;
        tuple.serialize_element(&base64url_encode(&self.0))?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(BufferVisitor)
    }
}

struct BufferVisitor;

impl<'de> Visitor<'de> for BufferVisitor {
    type Value = Buffer;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a [\"{BYTES_MARKER}\", <base64url>] byte buffer")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Buffer, A::Error> {
        let marker: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        if marker != BYTES_MARKER {
            return Err(de::Error::invalid_value(Unexpected::Str(&marker), &self));
        }

        let text: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }

        base64url_decode(&text)
            .map(Buffer)
            .map_err(de::Error::custom)
    }
}

/// Untyped JSON tree with an explicit byte-buffer node
#[derive(Debug, Clone, PartialEq)]
pub enum TransportValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<TransportValue>),
    Object(BTreeMap<String, TransportValue>),
}

impl TransportValue {
    /// Revive pass: turn every `["~b", <base64url>]` array into `Bytes`
    ///
    /// # Errors
    /// Returns `EncodingError::Base64` if a marker array carries invalid base64url.
    pub fn from_json(value: Value) -> Result<Self, EncodingError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => {
                if let Some(text) = marker_payload(&items) {
                    return Ok(Self::Bytes(base64url_decode(text)?));
                }
                Self::Array(
                    items
                        .into_iter()
                        .map(Self::from_json)
                        .collect::<Result<_, _>>()?,
                )
            }
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| Self::from_json(value).map(|value| (key, value)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Replace pass: turn every `Bytes` node back into its marker array
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
            Self::Bytes(bytes) => Value::Array(vec![
                Value::String(BYTES_MARKER.to_string()),
                Value::String(base64url_encode(&bytes)),
            ]),
            Self::Array(items) => Value::Array(items.into_iter().map(Self::into_json).collect()),
            Self::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into_json()))
                    .collect(),
            ),
        }
    }

    /// Parse JSON text and revive byte buffers
    ///
    /// # Errors
    /// Returns an error if the text is not JSON or a marker payload is not base64url.
    pub fn parse(text: &str) -> Result<Self, EncodingError> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Replace byte buffers and render JSON text
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.clone().into_json().to_string()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TransportValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

fn marker_payload(items: &[Value]) -> Option<&str> {
    match items {
        [Value::String(marker), Value::String(text)] if marker == BYTES_MARKER => Some(text),
        _ => None,
    }
}
