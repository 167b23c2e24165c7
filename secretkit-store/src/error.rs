//! Error types for secret and parameter management
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


use thiserror::Error;

/// Secret management errors
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflicting arguments: {0}")]
    ConflictingArguments(String),

    #[error("Invalid type for encryption: {0}")]
    InvalidTypeForEncryption(String),

    #[error("Encoding conflict: {0}")]
    EncodingConflict(String),

    #[error("Serialization unavailable: {0}")]
    SerializationUnavailable(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a mapping at: {0}")]
    NotAMapping(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any provider failure that is not classified above, carried verbatim
    #[error("Remote error: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl SecretError {
    /// Wrap an unclassified provider error
    pub fn remote<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SecretError::Remote(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, SecretError::AlreadyExists(_))
    }
}

/// Result type for secret operations
pub type SecretResult<T> = Result<T, SecretError>;
