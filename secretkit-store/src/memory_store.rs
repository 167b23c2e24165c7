//! In-process resource store
//!
//! Behaves like the remote services for the parts the deployer relies on:
//! monotonically increasing versions, tags, and `SecureString` values that
//! come back as ciphertext unless decryption is requested.
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
use crate::local_cipher::LocalCipher;
use crate::remote::{DeleteOptions, ResourceStore, WriteSpec};
use crate::resource::{RawValue, RemoteResource, ResourceKind, TagSet, ValueType, WriteReceipt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const LOCAL_REGION: &str = "us-east-1";
const LOCAL_ACCOUNT: &str = "000000000000";

/// Stored content, sealed when the value type is secure
#[derive(Debug, Clone)]
enum StoredValue {
    Plain(RawValue),
    Sealed { blob: Vec<u8>, binary: bool },
}

#[derive(Debug, Clone)]
struct StoredResource {
    value: StoredValue,
    value_type: ValueType,
    version: u64,
    last_modified: DateTime<Utc>,
    tags: TagSet,
    arn: String,
    key_id: String,
}

/// In-memory store of secrets or parameters
pub struct MemoryStore {
    kind: ResourceKind,
    cipher: LocalCipher,
    resources: RwLock<HashMap<String, StoredResource>>,
    writes: AtomicUsize,
    tag_calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store with its own random master key
    pub fn new(kind: ResourceKind) -> SecretResult<Self> {
        let mut master_key = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut master_key);
        Self::with_cipher(kind, LocalCipher::new(Some(&master_key[..]))?)
    }

    /// Create an empty store sealing secure values with `cipher`
    pub fn with_cipher(kind: ResourceKind, cipher: LocalCipher) -> SecretResult<Self> {
        Ok(Self {
            kind,
            cipher,
            resources: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            tag_calls: AtomicUsize::new(0),
        })
    }

    /// Number of content writes (creates and updates) performed
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of add/remove tag calls performed
    pub fn tag_call_count(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    /// Key id secure content of `name` is sealed under
    pub async fn key_id(&self, name: &str) -> SecretResult<String> {
        let resources = self.resources.read().await;
        resources
            .get(name)
            .map(|stored| stored.key_id.clone())
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }

    fn arn(&self, name: &str) -> String {
        match self.kind {
            ResourceKind::Parameter => format!(
                "arn:aws:ssm:{}:{}:parameter/{}",
                LOCAL_REGION,
                LOCAL_ACCOUNT,
                name.trim_start_matches('/')
            ),
            ResourceKind::Secret => format!(
                "arn:aws:secretsmanager:{}:{}:secret:{}",
                LOCAL_REGION, LOCAL_ACCOUNT, name
            ),
        }
    }

    fn effective_type(&self, spec: &WriteSpec) -> ValueType {
        match self.kind {
            ResourceKind::Secret => ValueType::SecureString,
            ResourceKind::Parameter => spec.value_type,
        }
    }

    fn store_value(
        &self,
        spec: &WriteSpec,
        value_type: ValueType,
        key_id: &str,
    ) -> SecretResult<StoredValue> {
        if !value_type.is_secure() {
            return Ok(StoredValue::Plain(spec.value.clone()));
        }
        Ok(StoredValue::Sealed {
            blob: self.cipher.seal(key_id, spec.value.fingerprint())?,
            binary: matches!(spec.value, RawValue::Binary(_)),
        })
    }

    fn load_value(&self, value: &StoredValue, with_decryption: bool) -> SecretResult<RawValue> {
        match value {
            StoredValue::Plain(raw) => Ok(raw.clone()),
            // secrets are always returned decrypted
            StoredValue::Sealed { blob, binary }
                if with_decryption || self.kind == ResourceKind::Secret =>
            {
                let plaintext = self.cipher.open(blob)?;
                if *binary {
                    Ok(RawValue::Binary(plaintext))
                } else {
                    String::from_utf8(plaintext)
                        .map(RawValue::Text)
                        .map_err(|e| SecretError::Decryption(format!("Invalid UTF-8: {}", e)))
                }
            }
            StoredValue::Sealed { blob, .. } => Ok(RawValue::Text(hex::encode(blob))),
        }
    }

    fn receipt(name: &str, stored: &StoredResource) -> WriteReceipt {
        WriteReceipt {
            name: name.to_string(),
            version: stored.version.to_string(),
            last_modified: stored.last_modified,
            arn: Some(stored.arn.clone()),
        }
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get_resource(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> SecretResult<RemoteResource> {
        let resources = self.resources.read().await;
        let stored = resources
            .get(name)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;

        Ok(RemoteResource {
            name: name.to_string(),
            value: self.load_value(&stored.value, with_decryption)?,
            value_type: stored.value_type,
            version: stored.version.to_string(),
            last_modified: stored.last_modified,
            tags: stored.tags.clone(),
            arn: Some(stored.arn.clone()),
            data_type: match self.kind {
                ResourceKind::Parameter => Some("text".to_string()),
                ResourceKind::Secret => None,
            },
            version_stages: match self.kind {
                ResourceKind::Parameter => Vec::new(),
                ResourceKind::Secret => vec!["AWSCURRENT".to_string()],
            },
        })
    }

    async fn create_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let mut resources = self.resources.write().await;
        if resources.contains_key(&spec.name) {
            return Err(SecretError::AlreadyExists(spec.name.clone()));
        }

        let value_type = self.effective_type(spec);
        let key_id = spec
            .key_id
            .clone()
            .unwrap_or_else(|| self.default_key_id().to_string());
        let stored = StoredResource {
            value: self.store_value(spec, value_type, &key_id)?,
            value_type,
            version: 1,
            last_modified: Utc::now(),
            tags: spec.tags.clone().unwrap_or_default(),
            arn: self.arn(&spec.name),
            key_id,
        };
        let receipt = Self::receipt(&spec.name, &stored);
        resources.insert(spec.name.clone(), stored);
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(name = %spec.name, kind = %self.kind, "Created in-memory resource");
        Ok(receipt)
    }

    async fn update_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let value_type = self.effective_type(spec);

        let mut resources = self.resources.write().await;
        let stored = resources
            .get_mut(&spec.name)
            .ok_or_else(|| SecretError::NotFound(spec.name.clone()))?;

        // without a key id the resource keeps its current key
        if let Some(key_id) = &spec.key_id {
            stored.key_id = key_id.clone();
        }
        stored.value = self.store_value(spec, value_type, &stored.key_id)?;
        stored.value_type = value_type;
        stored.version += 1;
        stored.last_modified = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(name = %spec.name, version = stored.version, "Updated in-memory resource");
        Ok(Self::receipt(&spec.name, stored))
    }

    async fn delete_resource(&self, name: &str, _options: &DeleteOptions) -> SecretResult<()> {
        let mut resources = self.resources.write().await;
        resources
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }

    async fn list_tags(&self, name: &str) -> SecretResult<TagSet> {
        let resources = self.resources.read().await;
        resources
            .get(name)
            .map(|stored| stored.tags.clone())
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }

    async fn add_tags(&self, name: &str, tags: &TagSet) -> SecretResult<()> {
        let mut resources = self.resources.write().await;
        let stored = resources
            .get_mut(name)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;
        stored
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_tags(&self, name: &str, keys: &[String]) -> SecretResult<()> {
        let mut resources = self.resources.write().await;
        let stored = resources
            .get_mut(name)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;
        for key in keys {
            stored.tags.remove(key);
        }
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
