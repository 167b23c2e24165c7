//! AWS backends
//!
//! [`SsmParameterStore`] and [`SecretsManagerStore`] implement
//! [`crate::remote::ResourceStore`], [`KmsCipher`] implements
//! [`crate::remote::KeyCipher`].
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


pub mod kms;
pub mod secrets_manager;
pub mod ssm;

pub use kms::KmsCipher;
pub use secrets_manager::SecretsManagerStore;
pub use ssm::SsmParameterStore;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use chrono::{DateTime, Utc};
use secretkit_config::AwsConfig;
use tracing::info;

/// SDK clients sharing one loaded AWS configuration
#[derive(Clone)]
pub struct AwsClients {
    pub ssm: aws_sdk_ssm::Client,
    pub secrets_manager: aws_sdk_secretsmanager::Client,
    pub kms: aws_sdk_kms::Client,
}

impl AwsClients {
    /// Load credentials and region from the default provider chain,
    /// overridden by the configured region and profile
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        info!(
            region = ?sdk_config.region().map(|r| r.as_ref()),
            profile = ?config.profile,
            "Loaded AWS configuration"
        );
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            ssm: aws_sdk_ssm::Client::new(sdk_config),
            secrets_manager: aws_sdk_secretsmanager::Client::new(sdk_config),
            kms: aws_sdk_kms::Client::new(sdk_config),
        }
    }

    pub fn parameter_store(&self) -> SsmParameterStore {
        SsmParameterStore::new(self.ssm.clone())
    }

    pub fn secrets_manager_store(&self) -> SecretsManagerStore {
        SecretsManagerStore::new(self.secrets_manager.clone())
    }

    pub fn kms_cipher(&self) -> KmsCipher {
        KmsCipher::new(self.kms.clone())
    }
}

/// Convert a provider timestamp, falling back to now when out of range
pub(crate) fn timestamp(secs: i64, nanos: u32) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion() {
        let ts = timestamp(1_700_000_000, 500);
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 500);
    }
}
