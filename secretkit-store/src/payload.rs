//! Payload normalization
//!
//! Turns caller data into the exact text (or bytes) stored remotely. The
//! encoded form doubles as the fingerprint used for duplicate detection, so
//! encoding must be deterministic: JSON is written compactly with sorted keys.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::{SecretError, SecretResult};
use crate::resource::{RawValue, ResourceKind, ValueType};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{Map, Value};

/// Key wrapping codec-encoded objects: `{"__object__": "<encoded>"}`
pub const OBJECT_ENVELOPE_KEY: &str = "__object__";

/// Item separator of `StringList` values
pub const LIST_DELIMITER: char = ',';

/// Data handed to the deployer
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Stored as-is
    Text(String),
    /// Raw bytes, secrets only
    Binary(Vec<u8>),
    /// Delimited for `StringList`, JSON otherwise
    List(Vec<Value>),
    /// Stored as JSON
    Map(Map<String, Value>),
    /// Stored through an [`ObjectCodec`] inside a JSON envelope
    Object(Value),
}

impl Payload {
    /// Capture any serializable object for codec-based storage
    pub fn object<T: Serialize>(object: &T) -> SecretResult<Self> {
        Ok(Payload::Object(serde_json::to_value(object)?))
    }

    /// Build a payload from an arbitrary JSON value
    pub fn json(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => Payload::List(items),
            Value::Object(map) => Payload::Map(map),
            other => Payload::Text(other.to_string()),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Binary(value)
    }
}

impl From<Vec<String>> for Payload {
    fn from(value: Vec<String>) -> Self {
        Payload::List(value.into_iter().map(Value::String).collect())
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(value: Map<String, Value>) -> Self {
        Payload::Map(value)
    }
}

/// Pluggable serializer for [`Payload::Object`]
pub trait ObjectCodec: Send + Sync {
    /// Encode an object into text
    fn encode(&self, object: &Value) -> SecretResult<String>;

    /// Decode text produced by [`ObjectCodec::encode`]
    fn decode(&self, encoded: &str) -> SecretResult<Value>;
}

/// Base64 over compact JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl ObjectCodec for Base64JsonCodec {
    fn encode(&self, object: &Value) -> SecretResult<String> {
        Ok(STANDARD.encode(serde_json::to_vec(object)?))
    }

    fn decode(&self, encoded: &str) -> SecretResult<Value> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| SecretError::Decryption(format!("Invalid base64 object: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Encode a payload into the value written to the remote store
pub fn encode(
    payload: &Payload,
    value_type: ValueType,
    kind: ResourceKind,
    codec: Option<&dyn ObjectCodec>,
) -> SecretResult<RawValue> {
    match payload {
        Payload::Text(text) => Ok(RawValue::Text(text.clone())),
        Payload::Binary(bytes) => match kind {
            ResourceKind::Secret => Ok(RawValue::Binary(bytes.clone())),
            ResourceKind::Parameter => Err(SecretError::EncodingConflict(
                "binary data can only be stored in a secret".to_string(),
            )),
        },
        Payload::List(items) if value_type == ValueType::StringList => {
            join_string_list(items).map(RawValue::Text)
        }
        Payload::List(items) => Ok(RawValue::Text(serde_json::to_string(items)?)),
        Payload::Map(map) => Ok(RawValue::Text(serde_json::to_string(map)?)),
        Payload::Object(object) => {
            let codec = codec.ok_or_else(|| {
                SecretError::SerializationUnavailable(
                    "an object codec is required to store arbitrary objects".to_string(),
                )
            })?;
            let mut envelope = Map::new();
            envelope.insert(
                OBJECT_ENVELOPE_KEY.to_string(),
                Value::String(codec.encode(object)?),
            );
            Ok(RawValue::Text(serde_json::to_string(&envelope)?))
        }
    }
}

fn join_string_list(items: &[Value]) -> SecretResult<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(s) = item else {
            return Err(SecretError::EncodingConflict(format!(
                "StringList items must be strings, got {}",
                item
            )));
        };
        if s.contains(LIST_DELIMITER) {
            return Err(SecretError::EncodingConflict(format!(
                "item {:?} contains '{}', use the String type instead",
                s, LIST_DELIMITER
            )));
        }
        parts.push(s.as_str());
    }
    Ok(parts.join(&LIST_DELIMITER.to_string()))
}

/// Decode an object envelope written by [`encode`]
pub fn decode_object(text: &str, codec: Option<&dyn ObjectCodec>) -> SecretResult<Value> {
    let codec = codec.ok_or_else(|| {
        SecretError::SerializationUnavailable(
            "an object codec is required to load arbitrary objects".to_string(),
        )
    })?;
    let envelope = parse_json(text)?;
    let encoded = envelope
        .get(OBJECT_ENVELOPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| SecretError::KeyNotFound(OBJECT_ENVELOPE_KEY.to_string()))?;
    codec.decode(encoded)
}

/// Parse JSON text that may contain `//` or `/* */` comments
pub fn parse_json(text: &str) -> SecretResult<Value> {
    Ok(serde_json::from_str(&strip_comments(text))?)
}

/// Remove `//` line comments and `/* */` block comments outside string literals
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let lookahead = chars.peek().copied();
        match (c, lookahead) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                // the newline itself is kept
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}
