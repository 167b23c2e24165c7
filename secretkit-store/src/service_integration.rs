//! Service integration helpers for using secrets in services
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


use crate::aws::{AwsClients, KmsCipher};
use crate::deployer::SecretDeployer;
use crate::error::{SecretError, SecretResult};
use crate::json_file::JsonSecretFile;
use crate::payload::Base64JsonCodec;
use crate::shell_env::EnvSecret;
use secretkit_config::SecretkitConfig;
use serde_json::Value;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

/// Deployers and cipher sharing one AWS session
pub struct SecretServices {
    pub parameters: SecretDeployer,
    pub secrets: SecretDeployer,
    pub kms: KmsCipher,
}

/// Initialize the AWS backed deployers for a service
pub async fn init_deployers(config: &SecretkitConfig) -> SecretServices {
    info!(
        region = ?config.aws.region,
        profile = ?config.aws.profile,
        "Initializing secret deployers"
    );

    let clients = AwsClients::from_config(&config.aws).await;
    let codec = Arc::new(Base64JsonCodec);

    SecretServices {
        parameters: SecretDeployer::with_codec(Arc::new(clients.parameter_store()), codec.clone()),
        secrets: SecretDeployer::with_codec(Arc::new(clients.secrets_manager_store()), codec),
        kms: clients.kms_cipher(),
    }
}

/// Open the configured local JSON secret file
pub async fn open_json_secret_file(config: &SecretkitConfig) -> SecretResult<JsonSecretFile> {
    let path = config
        .json_secret_file()
        .map_err(|e| SecretError::Configuration(e.to_string()))?;
    JsonSecretFile::open(path).await
}

/// Environment secrets persisted to the configured script
pub fn init_env_secret(config: &SecretkitConfig) -> SecretResult<EnvSecret> {
    let path = config
        .env_script()
        .map_err(|e| SecretError::Configuration(e.to_string()))?;
    Ok(EnvSecret::new(path))
}

/// Get a value from a remote resource with fallback to an environment variable
pub async fn get_value_with_fallback(
    deployer: &SecretDeployer,
    name: &str,
    path: &str,
    env_var: &str,
) -> Option<String> {
    // Try the remote store first
    match deployer.get_value(name, path).await {
        Ok(value) => {
            info!(name = %name, path = %path, "Retrieved value from remote store");
            return Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        }
        Err(e) => {
            warn!(
                name = %name,
                path = %path,
                error = %e,
                "Value not found in remote store, trying environment variable"
            );
        }
    }

    // Fallback to environment variable
    if let Ok(value) = env::var(env_var) {
        warn!(
            env_var = env_var,
            "Using value from environment variable (consider migrating to the remote store)"
        );
        return Some(value);
    }

    None
}
