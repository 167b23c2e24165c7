//! Local AES-256-GCM cipher
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
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Environment variable holding the master key (hex or passphrase)
pub const MASTER_KEY_ENV: &str = "SECRETKIT_MASTER_KEY";

const NONCE_LEN: usize = 12;

type MasterKey = [u8; 32];

/// Cipher keyed by a single master key.
///
/// Each key id gets its own subkey derived from the master key. Blobs are laid
/// out as `u16 key id length | key id | nonce | ciphertext`, so decryption
/// needs no key id, the same way KMS ciphertext blobs carry their key.
pub struct LocalCipher {
    master_key: MasterKey,
}

impl LocalCipher {
    /// Create a new cipher
    ///
    /// # Arguments
    /// * `master_key` - Optional 32 byte master key (if None, derived from environment or
    ///   generated)
    pub fn new(master_key: Option<&[u8]>) -> SecretResult<Self> {
        let master_key = match master_key {
            Some(key) => {
                if key.len() != 32 {
                    return Err(SecretError::Configuration(
                        "Master key must be exactly 32 bytes".to_string(),
                    ));
                }
                let mut mk = [0u8; 32];
                mk.copy_from_slice(key);
                mk
            }
            None => Self::derive_master_key(),
        };

        Ok(Self { master_key })
    }

    /// Derive master key from environment variable or generate a new one
    fn derive_master_key() -> MasterKey {
        if let Ok(key_str) = std::env::var(MASTER_KEY_ENV) {
            if let Ok(key_bytes) = hex::decode(&key_str) {
                if key_bytes.len() == 32 {
                    let mut mk = [0u8; 32];
                    mk.copy_from_slice(&key_bytes);
                    return mk;
                }
            }
            // Otherwise, derive from string using SHA256
            let hash = Sha256::digest(key_str.as_bytes());
            let mut mk = [0u8; 32];
            mk.copy_from_slice(&hash);
            return mk;
        }

        warn!("No {} found, generating an ephemeral master key", MASTER_KEY_ENV);
        let mut master_key = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut master_key);
        master_key
    }

    fn subkey(&self, key_id: &str) -> Aes256Gcm {
        let mut hasher = Sha256::new();
        hasher.update(self.master_key);
        hasher.update(key_id.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        Aes256Gcm::new(&key.into())
    }

    /// Encrypt `plaintext` under `key_id`
    pub fn seal(&self, key_id: &str, plaintext: &[u8]) -> SecretResult<Vec<u8>> {
        let id_len = u16::try_from(key_id.len())
            .map_err(|_| SecretError::InvalidArgument("key id too long".to_string()))?;

        let cipher = self.subkey(key_id);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| SecretError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(2 + key_id.len() + NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&id_len.to_be_bytes());
        blob.extend_from_slice(key_id.as_bytes());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a blob produced by [`LocalCipher::seal`]
    pub fn open(&self, blob: &[u8]) -> SecretResult<Vec<u8>> {
        let too_short = || SecretError::Decryption("Encrypted data too short".to_string());

        if blob.len() < 2 {
            return Err(too_short());
        }
        let id_len = u16::from_be_bytes([blob[0], blob[1]]) as usize;
        let rest = &blob[2..];
        if rest.len() < id_len + NONCE_LEN {
            return Err(too_short());
        }

        let (key_id, rest) = rest.split_at(id_len);
        let key_id = std::str::from_utf8(key_id)
            .map_err(|e| SecretError::Decryption(format!("Invalid key id: {}", e)))?;
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        self.subkey(key_id)
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| SecretError::Decryption(format!("Decryption failed: {}", e)))
    }
}

#[async_trait]
impl KeyCipher for LocalCipher {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> SecretResult<Vec<u8>> {
        self.seal(key_id, plaintext)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> SecretResult<Vec<u8>> {
        self.open(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> LocalCipher {
        LocalCipher::new(Some(&[7u8; 32][..])).unwrap()
    }

    #[tokio::test]
    async fn test_encrypt_decrypt() {
        let cipher = cipher();
        let blob = cipher.encrypt("alias/app", b"hello world").await.unwrap();
        assert_ne!(&blob[..], b"hello world");
        assert_eq!(cipher.decrypt(&blob).await.unwrap(), b"hello world");
    }

    #[test]
    fn test_key_ids_are_isolated() {
        let cipher = cipher();
        let mut blob = cipher.seal("alias/a", b"payload").unwrap();
        // swap the embedded key id for another of the same length
        blob[2 + "alias/".len()] = b'b';
        assert!(matches!(cipher.open(&blob), Err(SecretError::Decryption(_))));
    }

    #[test]
    fn test_wrong_master_key() {
        let blob = cipher().seal("alias/a", b"payload").unwrap();
        let other = LocalCipher::new(Some(&[8u8; 32][..])).unwrap();
        assert!(matches!(other.open(&blob), Err(SecretError::Decryption(_))));
    }

    #[test]
    fn test_truncated_blob() {
        let cipher = cipher();
        assert!(matches!(cipher.open(&[0]), Err(SecretError::Decryption(_))));
        assert!(matches!(cipher.open(&[0, 5, b'a']), Err(SecretError::Decryption(_))));
    }

    #[test]
    fn test_master_key_length() {
        assert!(matches!(
            LocalCipher::new(Some(&b"short"[..])),
            Err(SecretError::Configuration(_))
        ));
    }
}
