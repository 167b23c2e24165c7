//! KMS encryption backend
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
use crate::remote::KeyCipher;
use async_trait::async_trait;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client;
use tracing::debug;

/// Encrypts short blobs (up to 4 KiB) directly with a KMS key
#[derive(Clone)]
pub struct KmsCipher {
    client: Client,
}

impl KmsCipher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyCipher for KmsCipher {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> SecretResult<Vec<u8>> {
        let output = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .map_err(SecretError::remote)?;

        let ciphertext = output
            .ciphertext_blob()
            .ok_or_else(|| SecretError::Encryption("KMS returned no ciphertext".to_string()))?;

        debug!(key_id = %key_id, "Encrypted with KMS");
        Ok(ciphertext.as_ref().to_vec())
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> SecretResult<Vec<u8>> {
        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(SecretError::remote)?;

        let plaintext = output
            .plaintext()
            .ok_or_else(|| SecretError::Decryption("KMS returned no plaintext".to_string()))?;

        debug!(key_id = ?output.key_id(), "Decrypted with KMS");
        Ok(plaintext.as_ref().to_vec())
    }
}
