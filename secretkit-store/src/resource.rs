//! Remote resource model
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
use crate::json_path;
use crate::payload::{self, ObjectCodec, LIST_DELIMITER};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Tag key to tag value
pub type TagSet = BTreeMap<String, String>;

/// Kind of remote store holding a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Parameter store entry
    Parameter,
    /// Secrets manager entry
    Secret,
}

impl ResourceKind {
    /// Provider managed key used when no key id is given
    pub fn default_key_id(&self) -> &'static str {
        match self {
            ResourceKind::Parameter => "alias/aws/ssm",
            ResourceKind::Secret => "alias/aws/secretsmanager",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Parameter => write!(f, "parameter"),
            ResourceKind::Secret => write!(f, "secret"),
        }
    }
}

/// Stored value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    String,
    StringList,
    SecureString,
}

impl ValueType {
    /// Provider wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "String",
            ValueType::StringList => "StringList",
            ValueType::SecureString => "SecureString",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "String" => Some(ValueType::String),
            "StringList" => Some(ValueType::StringList),
            "SecureString" => Some(ValueType::SecureString),
            _ => None,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ValueType::SecureString)
    }
}

/// Parameter storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterTier {
    Standard,
    Advanced,
    IntelligentTiering,
}

impl ParameterTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterTier::Standard => "Standard",
            ParameterTier::Advanced => "Advanced",
            ParameterTier::IntelligentTiering => "Intelligent-Tiering",
        }
    }
}

/// Raw stored content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Binary(Vec<u8>),
}

impl RawValue {
    /// Bytes compared to decide whether a write is needed
    pub fn fingerprint(&self) -> &[u8] {
        match self {
            RawValue::Text(text) => text.as_bytes(),
            RawValue::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            RawValue::Binary(_) => None,
        }
    }

    fn to_utf8(&self) -> SecretResult<&str> {
        match self {
            RawValue::Text(text) => Ok(text),
            RawValue::Binary(bytes) => std::str::from_utf8(bytes)
                .map_err(|e| SecretError::EncodingConflict(format!("Invalid UTF-8: {}", e))),
        }
    }
}

/// A named secret or parameter as currently held by the remote store
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub name: String,
    pub value: RawValue,
    pub value_type: ValueType,
    /// Parameter version number or secret version id
    pub version: String,
    pub last_modified: DateTime<Utc>,
    pub tags: TagSet,
    pub arn: Option<String>,
    pub data_type: Option<String>,
    pub version_stages: Vec<String>,
}

impl RemoteResource {
    pub fn fingerprint(&self) -> &[u8] {
        self.value.fingerprint()
    }

    /// The text content, `None` for binary secrets
    pub fn string(&self) -> Option<&str> {
        self.value.as_text()
    }

    /// The binary content, `None` for text values
    pub fn binary(&self) -> Option<&[u8]> {
        match &self.value {
            RawValue::Binary(bytes) => Some(bytes),
            RawValue::Text(_) => None,
        }
    }

    /// Items of a delimited `StringList` value
    pub fn string_list(&self) -> SecretResult<Vec<String>> {
        Ok(self
            .value
            .to_utf8()?
            .split(LIST_DELIMITER)
            .map(str::to_string)
            .collect())
    }

    /// Content parsed as JSON, comments allowed
    pub fn json(&self) -> SecretResult<Value> {
        payload::parse_json(self.value.to_utf8()?)
    }

    /// Content decoded from an object envelope
    pub fn object<T: DeserializeOwned>(&self, codec: Option<&dyn ObjectCodec>) -> SecretResult<T> {
        let value = payload::decode_object(self.value.to_utf8()?, codec)?;
        Ok(serde_json::from_value(value)?)
    }

    /// A value inside the JSON content, addressed by a dotted path
    pub fn value_at(&self, path: &str) -> SecretResult<Value> {
        let document = self.json()?;
        json_path::get_value(&document, path).cloned()
    }

    /// Account id segment of the ARN
    pub fn aws_account_id(&self) -> Option<&str> {
        self.arn_segment(4)
    }

    /// Region segment of the ARN
    pub fn aws_region(&self) -> Option<&str> {
        self.arn_segment(3)
    }

    fn arn_segment(&self, index: usize) -> Option<&str> {
        self.arn
            .as_deref()
            .and_then(|arn| arn.split(':').nth(index))
            .filter(|s| !s.is_empty())
    }
}

/// Result of a content write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    pub name: String,
    pub version: String,
    pub last_modified: DateTime<Utc>,
    pub arn: Option<String>,
}

/// How a deploy treats an existing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Fail if the resource already exists
    Create,
    /// Overwrite or create
    #[default]
    Upsert,
    /// Create, silently do nothing if it already exists
    TryCreate,
}

/// Result of a deploy
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// Content was written
    Written(WriteReceipt),
    /// No content write happened
    NoOp,
}

impl DeployOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, DeployOutcome::NoOp)
    }

    pub fn receipt(&self) -> Option<&WriteReceipt> {
        match self {
            DeployOutcome::Written(receipt) => Some(receipt),
            DeployOutcome::NoOp => None,
        }
    }
}

/// Options of a single deploy call
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub description: Option<String>,
    /// Inferred when unset: `SecureString` for secrets or when a key is given
    pub value_type: Option<ValueType>,
    pub kms_key_id: Option<String>,
    pub use_default_kms_key: bool,
    pub tier: Option<ParameterTier>,
    pub policies: Option<String>,
    /// `None` leaves tags untouched, an empty set removes them all
    pub tags: Option<TagSet>,
    pub update_mode: UpdateMode,
    pub skip_duplicate: bool,
    pub client_request_token: Option<String>,
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            description: None,
            value_type: None,
            kms_key_id: None,
            use_default_kms_key: false,
            tier: None,
            policies: None,
            tags: None,
            update_mode: UpdateMode::Upsert,
            skip_duplicate: true,
            client_request_token: None,
        }
    }
}

impl DeployRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(key_id.into());
        self
    }

    pub fn use_default_kms_key(mut self, enabled: bool) -> Self {
        self.use_default_kms_key = enabled;
        self
    }

    pub fn tier(mut self, tier: ParameterTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn policies(mut self, policies: impl Into<String>) -> Self {
        self.policies = Some(policies.into());
        self
    }

    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn skip_duplicate(mut self, enabled: bool) -> Self {
        self.skip_duplicate = enabled;
        self
    }

    pub fn client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: RawValue) -> RemoteResource {
        RemoteResource {
            name: "app/config".to_string(),
            value,
            value_type: ValueType::String,
            version: "1".to_string(),
            last_modified: Utc::now(),
            tags: TagSet::new(),
            arn: Some("arn:aws:ssm:us-east-1:123456789012:parameter/app/config".to_string()),
            data_type: Some("text".to_string()),
            version_stages: Vec::new(),
        }
    }

    #[test]
    fn test_arn_segments() {
        let r = resource(RawValue::Text("x".to_string()));
        assert_eq!(r.aws_account_id(), Some("123456789012"));
        assert_eq!(r.aws_region(), Some("us-east-1"));

        let mut r = r;
        r.arn = None;
        assert_eq!(r.aws_account_id(), None);
    }

    #[test]
    fn test_accessors() {
        let r = resource(RawValue::Text("a,b,c".to_string()));
        assert_eq!(r.string(), Some("a,b,c"));
        assert_eq!(r.string_list().unwrap(), vec!["a", "b", "c"]);
        assert!(r.binary().is_none());

        let r = resource(RawValue::Text(
            "{\n  // owner\n  \"mydb\": {\"host\": \"localhost\"}\n}".to_string(),
        ));
        assert_eq!(r.json().unwrap(), json!({"mydb": {"host": "localhost"}}));
        assert_eq!(r.value_at("mydb.host").unwrap(), json!("localhost"));
    }

    #[test]
    fn test_binary_json() {
        let r = resource(RawValue::Binary(br#"{"k": 1}"#.to_vec()));
        assert_eq!(r.string(), None);
        assert_eq!(r.json().unwrap(), json!({"k": 1}));
    }

    #[test]
    fn test_request_defaults() {
        let request = DeployRequest::new();
        assert_eq!(request.update_mode, UpdateMode::Upsert);
        assert!(request.skip_duplicate);
        assert!(request.tags.is_none());

        let request = DeployRequest::new().tags([("Env", "prod")]);
        assert_eq!(request.tags.unwrap().get("Env").map(String::as_str), Some("prod"));
    }
}
