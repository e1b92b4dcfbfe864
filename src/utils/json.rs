use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use p256::ecdsa::VerifyingKey;
use serde::Deserialize;
use serde_json::{value::RawValue, Map, Value};

use crate::{constants::ECDSA_SIGNATURE_LEN, error::ParseError, utils::crypto::verify_p256_signature};

/// A signed collateral document: `{"<body>": {...}, "signature": "<hex>"}`.
///
/// The signature covers the exact text of the body, so it is kept as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub body_key: &'static str,
    pub body_text: String,
    pub body: Value,
    pub signature: [u8; ECDSA_SIGNATURE_LEN],
}

impl SignedEnvelope {
    /// Parse an envelope whose body sits under the first of `body_keys` that is present.
    pub fn parse(json: &str, body_keys: &[&'static str]) -> Result<Self, ParseError> {
        Self::from_document(&Self::parse_document(json)?, body_keys)
    }

    /// Split the top-level object into its members, keeping each as raw text.
    pub fn parse_document(json: &str) -> Result<BTreeMap<String, Box<RawValue>>, ParseError> {
        serde_json::from_str(json)
            .map_err(|e| ParseError::format(format!("document should be a JSON object: {e}")))
    }

    /// A missing or non-object body is a format error; a missing or malformed signature is an
    /// invalid-extension error.
    pub fn from_document(
        envelope: &BTreeMap<String, Box<RawValue>>,
        body_keys: &[&'static str],
    ) -> Result<Self, ParseError> {
        let (body_key, raw) = body_keys
            .iter()
            .find_map(|key| envelope.get(*key).map(|raw| (*key, raw)))
            .ok_or_else(|| ParseError::format(format!("document should have one of {body_keys:?}")))?;
        let body: Value = serde_json::from_str(raw.get())
            .map_err(|e| ParseError::format(format!("[{body_key}] is not valid JSON: {e}")))?;
        if !body.is_object() {
            return Err(ParseError::format(format!("[{body_key}] should be a JSON object")));
        }

        let signature = envelope
            .get("signature")
            .ok_or_else(|| ParseError::invalid("document should have [signature] field"))?;
        let signature = serde_json::from_str::<String>(signature.get())
            .ok()
            .and_then(|text| decode_hex_array::<ECDSA_SIGNATURE_LEN>(&text))
            .ok_or_else(|| {
                ParseError::invalid(format!(
                    "[signature] should be {} hex characters",
                    ECDSA_SIGNATURE_LEN * 2
                ))
            })?;

        Ok(Self {
            body_key,
            body_text: raw.get().to_owned(),
            body,
            signature,
        })
    }

    pub fn verify(&self, key: &VerifyingKey) -> anyhow::Result<()> {
        verify_p256_signature(key, self.body_text.as_bytes(), &self.signature)
    }
}

/// Typed field access over a JSON object.
///
/// A missing field is a format error; a field that is present but cannot be read as the
/// requested type is an invalid-extension error.
#[derive(Debug, Clone, Copy)]
pub struct JsonFields<'a> {
    what: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> JsonFields<'a> {
    pub fn new(value: &'a Value, what: &'static str) -> Result<Self, ParseError> {
        match value.as_object() {
            Some(map) => Ok(Self { what, map }),
            None => Err(ParseError::format(format!("{what} should be a JSON object"))),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn required(&self, name: &str) -> Result<&'a Value, ParseError> {
        self.map
            .get(name)
            .ok_or_else(|| ParseError::format(format!("{} should have [{name}] field", self.what)))
    }

    /// Deserialize field `name` as `T`.
    pub fn typed<T: Deserialize<'a>>(&self, name: &str) -> Result<T, ParseError> {
        let value = self.required(name)?;
        T::deserialize(value).map_err(|e| {
            ParseError::invalid(format!("could not parse [{name}] field of {}: {e}", self.what))
        })
    }

    pub fn string(&self, name: &str) -> Result<&'a str, ParseError> {
        self.required(name)?.as_str().ok_or_else(|| {
            ParseError::invalid(format!("[{name}] field of {} should be a string", self.what))
        })
    }

    pub fn date(&self, name: &str) -> Result<DateTime<Utc>, ParseError> {
        self.typed(name)
    }

    /// Field holding exactly `N` bytes as `2 * N` hex characters.
    pub fn hex<const N: usize>(&self, name: &str) -> Result<[u8; N], ParseError> {
        let text = self.string(name)?;
        decode_hex_array(text).ok_or_else(|| {
            ParseError::invalid(format!(
                "[{name}] field of {} should be {} hex characters",
                self.what,
                N * 2
            ))
        })
    }

    pub fn array(&self, name: &str) -> Result<&'a Vec<Value>, ParseError> {
        self.required(name)?.as_array().ok_or_else(|| {
            ParseError::invalid(format!("[{name}] field of {} should be an array", self.what))
        })
    }

    pub fn object(&self, name: &str, what: &'static str) -> Result<JsonFields<'a>, ParseError> {
        JsonFields::new(self.required(name)?, what)
    }

    /// Optional array of strings; absent means empty.
    pub fn optional_strings(&self, name: &str) -> Result<Vec<String>, ParseError> {
        if !self.has(name) {
            return Ok(Vec::new());
        }
        self.typed(name)
    }
}

pub fn decode_hex_array<const N: usize>(text: &str) -> Option<[u8; N]> {
    if text.len() != N * 2 {
        return None;
    }
    hex::decode(text).ok()?.try_into().ok()
}
