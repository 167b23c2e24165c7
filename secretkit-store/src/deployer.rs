//! Idempotent deployment of secrets and parameters
//!
//! A deploy compares the encoded payload with what the store currently holds
//! and only writes when they differ. Tags are reconciled as a separate step,
//! so a skipped content write can still change tags.
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
use crate::payload::{self, ObjectCodec, Payload};
use crate::remote::{DeleteOptions, ResourceStore, WriteSpec};
use crate::resource::{
    DeployOutcome, DeployRequest, RawValue, RemoteResource, ResourceKind, TagSet, UpdateMode,
    ValueType,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Deploys and reads resources of one remote store
pub struct SecretDeployer {
    store: Arc<dyn ResourceStore>,
    codec: Option<Arc<dyn ObjectCodec>>,
}

impl SecretDeployer {
    /// Create a deployer without object serialization support
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store, codec: None }
    }

    /// Create a deployer that stores [`Payload::Object`] through `codec`
    pub fn with_codec(store: Arc<dyn ResourceStore>, codec: Arc<dyn ObjectCodec>) -> Self {
        Self {
            store,
            codec: Some(codec),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.store.kind()
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Create or update `name` with `payload`.
    ///
    /// Argument and encoding errors are raised before the store is contacted.
    /// With [`UpdateMode::Upsert`] and duplicate skipping enabled, an unchanged
    /// payload returns [`DeployOutcome::NoOp`] without a content write.
    ///
    /// Concurrent deploys to the same name are not serialized: the compare
    /// and the write are separate calls.
    pub async fn deploy(
        &self,
        name: &str,
        payload: &Payload,
        request: &DeployRequest,
    ) -> SecretResult<DeployOutcome> {
        let (value_type, key_id) = self.resolve_encryption(request)?;
        let value = payload::encode(payload, value_type, self.kind(), self.codec.as_deref())?;

        match request.update_mode {
            UpdateMode::Create => {
                let spec = self.write_spec(name, value, value_type, key_id, request, true);
                self.create(&spec).await
            }
            UpdateMode::TryCreate => {
                let spec = self.write_spec(name, value, value_type, key_id, request, true);
                match self.create(&spec).await {
                    Err(e) if e.is_already_exists() => {
                        debug!(name = %name, "Resource already exists, nothing created");
                        Ok(DeployOutcome::NoOp)
                    }
                    result => result,
                }
            }
            UpdateMode::Upsert if request.skip_duplicate => {
                let Some(current) = self.find_resource(name).await? else {
                    let spec = self.write_spec(name, value, value_type, key_id, request, true);
                    return self.create(&spec).await;
                };

                if current.fingerprint() == value.fingerprint() {
                    debug!(
                        name = %name,
                        version = %current.version,
                        "Content unchanged, skipping write"
                    );
                    self.reconcile_tags(name, request.tags.as_ref()).await?;
                    return Ok(DeployOutcome::NoOp);
                }

                let spec = self.write_spec(name, value, value_type, key_id, request, false);
                self.update(&spec, request.tags.as_ref()).await
            }
            UpdateMode::Upsert => {
                let spec = self.write_spec(name, value, value_type, key_id, request, false);
                let updated = self.update(&spec, request.tags.as_ref()).await;
                match updated {
                    Err(e) if e.is_not_found() => {
                        let spec = WriteSpec {
                            tags: request.tags.clone(),
                            ..spec
                        };
                        self.create(&spec).await
                    }
                    result => result,
                }
            }
        }
    }

    /// Make the tags of `name` exactly `tags`.
    ///
    /// `None` leaves tags untouched and an empty set removes all of them.
    /// Stale keys are removed before the new set is added; a failure between
    /// the two calls leaves the resource with a partial tag set.
    pub async fn reconcile_tags(&self, name: &str, tags: Option<&TagSet>) -> SecretResult<()> {
        let Some(desired) = tags else {
            return Ok(());
        };

        let current = self.store.list_tags(name).await?;
        let stale: Vec<String> = current
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();

        if !stale.is_empty() {
            debug!(name = %name, count = stale.len(), "Removing stale tags");
            self.store.remove_tags(name, &stale).await?;
        }
        if !desired.is_empty() {
            debug!(name = %name, count = desired.len(), "Applying tags");
            self.store.add_tags(name, desired).await?;
        }
        Ok(())
    }

    /// Fetch `name`, decrypting secure values
    pub async fn get_resource(&self, name: &str) -> SecretResult<RemoteResource> {
        let resource = self.store.get_resource(name, false).await?;
        if resource.value_type.is_secure() && self.kind() == ResourceKind::Parameter {
            debug!(name = %name, "Refetching secure value with decryption");
            return self.store.get_resource(name, true).await;
        }
        debug!(name = %name, version = %resource.version, "Fetched resource");
        Ok(resource)
    }

    /// Like [`SecretDeployer::get_resource`], `None` when it does not exist
    pub async fn find_resource(&self, name: &str) -> SecretResult<Option<RemoteResource>> {
        match self.get_resource(name).await {
            Ok(resource) => Ok(Some(resource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Content of `name` parsed as JSON
    pub async fn get_data(&self, name: &str) -> SecretResult<Value> {
        self.get_resource(name).await?.json()
    }

    /// A value inside the JSON content of `name`
    pub async fn get_value(&self, name: &str, path: &str) -> SecretResult<Value> {
        let data = self.get_data(name).await?;
        json_path::get_value(&data, path).cloned()
    }

    /// Content of `name` decoded through the configured codec
    pub async fn get_object<T: DeserializeOwned>(&self, name: &str) -> SecretResult<T> {
        let resource = self.get_resource(name).await?;
        resource.object(self.codec.as_deref())
    }

    /// Delete `name`, returning `false` when it did not exist
    pub async fn delete(&self, name: &str, options: &DeleteOptions) -> SecretResult<bool> {
        match self.store.delete_resource(name, options).await {
            Ok(()) => {
                info!(name = %name, kind = %self.kind(), "Deleted resource");
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!(name = %name, "Resource already absent");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Value type and key id a write will use
    fn resolve_encryption(
        &self,
        request: &DeployRequest,
    ) -> SecretResult<(ValueType, Option<String>)> {
        if request.kms_key_id.is_some() && request.use_default_kms_key {
            return Err(SecretError::ConflictingArguments(
                "kms_key_id and use_default_kms_key are mutually exclusive".to_string(),
            ));
        }
        let wants_key = request.kms_key_id.is_some() || request.use_default_kms_key;

        let value_type = match (request.value_type, wants_key) {
            (Some(value_type), true) if !value_type.is_secure() => {
                return Err(SecretError::InvalidTypeForEncryption(format!(
                    "{} cannot be encrypted, use SecureString",
                    value_type.as_str()
                )));
            }
            (Some(value_type), _) => value_type,
            (None, true) => ValueType::SecureString,
            (None, false) => match self.kind() {
                ResourceKind::Secret => ValueType::SecureString,
                ResourceKind::Parameter => ValueType::String,
            },
        };

        // secrets keep their current key unless one is requested
        let key_id = match &request.kms_key_id {
            Some(key_id) => Some(key_id.clone()),
            None if request.use_default_kms_key => Some(self.store.default_key_id().to_string()),
            None if value_type.is_secure() && self.kind() == ResourceKind::Parameter => {
                Some(self.store.default_key_id().to_string())
            }
            None => None,
        };
        Ok((value_type, key_id))
    }

    fn write_spec(
        &self,
        name: &str,
        value: RawValue,
        value_type: ValueType,
        key_id: Option<String>,
        request: &DeployRequest,
        with_tags: bool,
    ) -> WriteSpec {
        WriteSpec {
            name: name.to_string(),
            value,
            value_type,
            key_id,
            description: request.description.clone(),
            tier: request.tier,
            policies: request.policies.clone(),
            tags: if with_tags { request.tags.clone() } else { None },
            client_request_token: request.client_request_token.clone(),
        }
    }

    async fn create(&self, spec: &WriteSpec) -> SecretResult<DeployOutcome> {
        let receipt = self.store.create_resource(spec).await?;
        info!(
            name = %spec.name,
            kind = %self.kind(),
            version = %receipt.version,
            "Created resource"
        );
        Ok(DeployOutcome::Written(receipt))
    }

    async fn update(&self, spec: &WriteSpec, tags: Option<&TagSet>) -> SecretResult<DeployOutcome> {
        let receipt = self.store.update_resource(spec).await?;
        info!(
            name = %spec.name,
            kind = %self.kind(),
            version = %receipt.version,
            "Updated resource"
        );
        self.reconcile_tags(&spec.name, tags).await?;
        Ok(DeployOutcome::Written(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;

    fn deployer(kind: ResourceKind) -> SecretDeployer {
        SecretDeployer::new(Arc::new(MemoryStore::new(kind).unwrap()))
    }

    #[test]
    fn test_resolve_defaults() {
        let params = deployer(ResourceKind::Parameter);
        let (value_type, key_id) = params.resolve_encryption(&DeployRequest::new()).unwrap();
        assert_eq!(value_type, ValueType::String);
        assert!(key_id.is_none());

        let secrets = deployer(ResourceKind::Secret);
        let (value_type, key_id) = secrets.resolve_encryption(&DeployRequest::new()).unwrap();
        assert_eq!(value_type, ValueType::SecureString);
        assert!(key_id.is_none());

        let request = DeployRequest::new().use_default_kms_key(true);
        let (_, key_id) = secrets.resolve_encryption(&request).unwrap();
        assert_eq!(key_id.as_deref(), Some("alias/aws/secretsmanager"));
    }

    #[test]
    fn test_resolve_key_infers_secure_type() {
        let params = deployer(ResourceKind::Parameter);
        let request = DeployRequest::new().kms_key_id("alias/app");
        let (value_type, key_id) = params.resolve_encryption(&request).unwrap();
        assert_eq!(value_type, ValueType::SecureString);
        assert_eq!(key_id.as_deref(), Some("alias/app"));

        let request = DeployRequest::new().use_default_kms_key(true);
        let (_, key_id) = params.resolve_encryption(&request).unwrap();
        assert_eq!(key_id.as_deref(), Some("alias/aws/ssm"));
    }

    #[test]
    fn test_resolve_rejects_plain_type_with_key() {
        let params = deployer(ResourceKind::Parameter);
        let request = DeployRequest::new()
            .value_type(ValueType::StringList)
            .use_default_kms_key(true);
        assert!(matches!(
            params.resolve_encryption(&request),
            Err(SecretError::InvalidTypeForEncryption(_))
        ));
    }
}
