//! Secrets Manager backend
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


use super::timestamp;
use crate::error::{SecretError, SecretResult};
use crate::remote::{DeleteOptions, ResourceStore, WriteSpec};
use crate::resource::{RawValue, RemoteResource, ResourceKind, TagSet, ValueType, WriteReceipt};
use async_trait::async_trait;
use aws_sdk_secretsmanager::primitives::Blob;
use aws_sdk_secretsmanager::types::Tag;
use aws_sdk_secretsmanager::Client;
use chrono::Utc;
use tracing::debug;

/// Secrets stored in AWS Secrets Manager.
///
/// Secret values are always returned decrypted, so `with_decryption` is
/// ignored and every secret reports [`ValueType::SecureString`].
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_sm_tags(tags: &TagSet) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

#[async_trait]
impl ResourceStore for SecretsManagerStore {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Secret
    }

    async fn get_resource(
        &self,
        name: &str,
        _with_decryption: bool,
    ) -> SecretResult<RemoteResource> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;

        let value = match (output.secret_binary(), output.secret_string()) {
            (Some(blob), _) => RawValue::Binary(blob.as_ref().to_vec()),
            (None, text) => RawValue::Text(text.unwrap_or_default().to_string()),
        };
        let version = output.version_id().unwrap_or_default().to_string();
        let tags = self.list_tags(name).await?;

        debug!(name = %name, version = %version, "Fetched secret");
        Ok(RemoteResource {
            name: output.name().unwrap_or(name).to_string(),
            value,
            value_type: ValueType::SecureString,
            version,
            last_modified: output
                .created_date()
                .map(|dt| timestamp(dt.secs(), dt.subsec_nanos()))
                .unwrap_or_else(Utc::now),
            tags,
            arn: output.arn().map(str::to_string),
            data_type: None,
            version_stages: output.version_stages().to_vec(),
        })
    }

    async fn create_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let mut request = self
            .client
            .create_secret()
            .name(&spec.name)
            .set_description(spec.description.clone())
            .set_kms_key_id(spec.key_id.clone())
            .set_client_request_token(spec.client_request_token.clone());

        request = match &spec.value {
            RawValue::Text(text) => request.secret_string(text),
            RawValue::Binary(bytes) => request.secret_binary(Blob::new(bytes.clone())),
        };
        if let Some(tags) = spec.tags.as_ref().filter(|tags| !tags.is_empty()) {
            request = request.set_tags(Some(to_sm_tags(tags)));
        }

        let output = request.send().await.map_err(|err| {
            let exists = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_exists_exception());
            if exists {
                SecretError::AlreadyExists(spec.name.clone())
            } else {
                SecretError::remote(err)
            }
        })?;

        Ok(WriteReceipt {
            name: output.name().unwrap_or(&spec.name).to_string(),
            version: output.version_id().unwrap_or_default().to_string(),
            last_modified: Utc::now(),
            arn: output.arn().map(str::to_string),
        })
    }

    async fn update_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let mut request = self
            .client
            .update_secret()
            .secret_id(&spec.name)
            .set_description(spec.description.clone())
            .set_kms_key_id(spec.key_id.clone())
            .set_client_request_token(spec.client_request_token.clone());

        request = match &spec.value {
            RawValue::Text(text) => request.secret_string(text),
            RawValue::Binary(bytes) => request.secret_binary(Blob::new(bytes.clone())),
        };

        let output = request.send().await.map_err(|err| {
            let not_found = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception());
            if not_found {
                SecretError::NotFound(spec.name.clone())
            } else {
                SecretError::remote(err)
            }
        })?;

        Ok(WriteReceipt {
            name: output.name().unwrap_or(&spec.name).to_string(),
            version: output.version_id().unwrap_or_default().to_string(),
            last_modified: Utc::now(),
            arn: output.arn().map(str::to_string),
        })
    }

    async fn delete_resource(&self, name: &str, options: &DeleteOptions) -> SecretResult<()> {
        let mut request = self.client.delete_secret().secret_id(name);
        // the service rejects a recovery window combined with force delete
        if options.force_delete_without_recovery {
            request = request.force_delete_without_recovery(true);
        } else {
            request = request.set_recovery_window_in_days(options.recovery_window_in_days);
        }

        request.send().await.map_err(|err| {
            let not_found = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception());
            if not_found {
                SecretError::NotFound(name.to_string())
            } else {
                SecretError::remote(err)
            }
        })?;
        Ok(())
    }

    async fn list_tags(&self, name: &str) -> SecretResult<TagSet> {
        let output = self
            .client
            .describe_secret()
            .secret_id(name)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;

        Ok(output
            .tags()
            .iter()
            .filter_map(|tag| {
                let value = tag.value().unwrap_or_default().to_string();
                Some((tag.key()?.to_string(), value))
            })
            .collect())
    }

    async fn add_tags(&self, name: &str, tags: &TagSet) -> SecretResult<()> {
        self.client
            .tag_resource()
            .secret_id(name)
            .set_tags(Some(to_sm_tags(tags)))
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;
        Ok(())
    }

    async fn remove_tags(&self, name: &str, keys: &[String]) -> SecretResult<()> {
        self.client
            .untag_resource()
            .secret_id(name)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;
        Ok(())
    }
}
