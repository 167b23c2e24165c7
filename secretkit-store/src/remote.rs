//! Remote store interface
//!
//! This module provides the trait-based boundary to the services that
//! actually hold secrets:
//! - AWS Systems Manager Parameter Store
//! - AWS Secrets Manager
//! - AWS Key Management Service (encryption only)
//! - An in-process store for tests and offline tooling
//!
//! Backends classify the provider failures callers branch on (not found,
//! already exists) into `SecretError` variants. Every other failure is
//! returned as `SecretError::Remote` untouched.
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


use crate::error::SecretResult;
use crate::resource::{
    ParameterTier, RawValue, RemoteResource, ResourceKind, TagSet, ValueType, WriteReceipt,
};
use async_trait::async_trait;

/// Arguments of a create or update call
#[derive(Debug, Clone)]
pub struct WriteSpec {
    pub name: String,
    pub value: RawValue,
    pub value_type: ValueType,
    pub key_id: Option<String>,
    pub description: Option<String>,
    pub tier: Option<ParameterTier>,
    pub policies: Option<String>,
    /// Only sent on create
    pub tags: Option<TagSet>,
    pub client_request_token: Option<String>,
}

/// Arguments of a delete call
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Secrets only
    pub recovery_window_in_days: Option<i64>,
    /// Secrets only
    pub force_delete_without_recovery: bool,
}

/// A store of named secrets or parameters
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Which kind of resource this store holds
    fn kind(&self) -> ResourceKind;

    /// Key used for secure values when the caller asks for the default key
    fn default_key_id(&self) -> &str {
        self.kind().default_key_id()
    }

    /// Fetch the current state of a resource.
    ///
    /// Returns [`crate::SecretError::NotFound`] when it does not exist.
    async fn get_resource(&self, name: &str, with_decryption: bool) -> SecretResult<RemoteResource>;

    /// Create a new resource.
    ///
    /// Returns [`crate::SecretError::AlreadyExists`] on a name collision.
    async fn create_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt>;

    /// Replace the content of an existing resource.
    ///
    /// Returns [`crate::SecretError::NotFound`] when it does not exist.
    async fn update_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt>;

    /// Delete a resource.
    ///
    /// Returns [`crate::SecretError::NotFound`] when it does not exist.
    async fn delete_resource(&self, name: &str, options: &DeleteOptions) -> SecretResult<()>;

    /// Tags currently attached to a resource
    async fn list_tags(&self, name: &str) -> SecretResult<TagSet>;

    /// Attach tags, overwriting values of existing keys
    async fn add_tags(&self, name: &str, tags: &TagSet) -> SecretResult<()>;

    /// Detach tags by key
    async fn remove_tags(&self, name: &str, keys: &[String]) -> SecretResult<()>;
}

/// Symmetric encryption of short blobs
#[async_trait]
pub trait KeyCipher: Send + Sync {
    /// Encrypt `plaintext` under `key_id`
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> SecretResult<Vec<u8>>;

    /// Decrypt a blob produced by [`KeyCipher::encrypt`]
    async fn decrypt(&self, ciphertext: &[u8]) -> SecretResult<Vec<u8>>;
}
