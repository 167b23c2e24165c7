//! Systems Manager Parameter Store backend
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
use aws_sdk_ssm::operation::put_parameter::builders::PutParameterFluentBuilder;
use aws_sdk_ssm::types::{ParameterTier, ParameterType, ResourceTypeForTagging, Tag};
use aws_sdk_ssm::Client;
use chrono::Utc;
use tracing::debug;

/// Parameters stored in AWS Systems Manager
#[derive(Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn put_request(
        &self,
        spec: &WriteSpec,
        overwrite: bool,
    ) -> SecretResult<PutParameterFluentBuilder> {
        let value = spec.value.as_text().ok_or_else(|| {
            SecretError::EncodingConflict("parameters cannot hold binary data".to_string())
        })?;

        let mut request = self
            .client
            .put_parameter()
            .name(&spec.name)
            .value(value)
            .r#type(ParameterType::from(spec.value_type.as_str()))
            .overwrite(overwrite)
            .set_description(spec.description.clone())
            .set_tier(spec.tier.map(|tier| ParameterTier::from(tier.as_str())))
            .set_policies(spec.policies.clone());

        if spec.value_type.is_secure() {
            request = request.set_key_id(spec.key_id.clone());
        }
        // tags are rejected by the service when overwriting
        if !overwrite {
            if let Some(tags) = spec.tags.as_ref().filter(|tags| !tags.is_empty()) {
                request = request.set_tags(Some(to_ssm_tags(tags)?));
            }
        }
        Ok(request)
    }
}

fn to_ssm_tags(tags: &TagSet) -> SecretResult<Vec<Tag>> {
    tags.iter()
        .map(|(key, value)| {
            Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(SecretError::remote)
        })
        .collect()
}

#[async_trait]
impl ResourceStore for SsmParameterStore {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Parameter
    }

    async fn get_resource(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> SecretResult<RemoteResource> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;

        let parameter = output
            .parameter
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;
        let tags = self.list_tags(name).await?;

        debug!(name = %name, version = parameter.version(), "Fetched parameter");
        Ok(RemoteResource {
            name: parameter.name().unwrap_or(name).to_string(),
            value: RawValue::Text(parameter.value().unwrap_or_default().to_string()),
            value_type: parameter
                .r#type()
                .and_then(|t| ValueType::from_wire(t.as_str()))
                .unwrap_or(ValueType::String),
            version: parameter.version().to_string(),
            last_modified: parameter
                .last_modified_date()
                .map(|dt| timestamp(dt.secs(), dt.subsec_nanos()))
                .unwrap_or_else(Utc::now),
            tags,
            arn: parameter.arn().map(str::to_string),
            data_type: parameter.data_type().map(str::to_string),
            version_stages: Vec::new(),
        })
    }

    async fn create_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let output = self
            .put_request(spec, false)?
            .send()
            .await
            .map_err(|err| {
                let exists = err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_already_exists());
                if exists {
                    SecretError::AlreadyExists(spec.name.clone())
                } else {
                    SecretError::remote(err)
                }
            })?;

        Ok(WriteReceipt {
            name: spec.name.clone(),
            version: output.version().to_string(),
            last_modified: Utc::now(),
            arn: None,
        })
    }

    /// Overwrites the parameter.
    ///
    /// The service creates a missing parameter on overwrite instead of
    /// failing, so this never returns `NotFound`.
    async fn update_resource(&self, spec: &WriteSpec) -> SecretResult<WriteReceipt> {
        let output = self
            .put_request(spec, true)?
            .send()
            .await
            .map_err(SecretError::remote)?;

        Ok(WriteReceipt {
            name: spec.name.clone(),
            version: output.version().to_string(),
            last_modified: Utc::now(),
            arn: None,
        })
    }

    async fn delete_resource(&self, name: &str, _options: &DeleteOptions) -> SecretResult<()> {
        self.client
            .delete_parameter()
            .name(name)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found());
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
            .list_tags_for_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(name)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_invalid_resource_id());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;

        Ok(output
            .tag_list()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect())
    }

    async fn add_tags(&self, name: &str, tags: &TagSet) -> SecretResult<()> {
        self.client
            .add_tags_to_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(name)
            .set_tags(Some(to_ssm_tags(tags)?))
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_invalid_resource_id());
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
            .remove_tags_from_resource()
            .resource_type(ResourceTypeForTagging::Parameter)
            .resource_id(name)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_invalid_resource_id());
                if not_found {
                    SecretError::NotFound(name.to_string())
                } else {
                    SecretError::remote(err)
                }
            })?;
        Ok(())
    }
}
