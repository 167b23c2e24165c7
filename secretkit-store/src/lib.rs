//! Secret and parameter management for secretkit
//!
//! Idempotent deployment of secrets and parameters to AWS, dotted-path access
//! into their JSON content, and local file and shell environment helpers.
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


pub mod aws;
pub mod deployer;
pub mod error;
pub mod json_file;
pub mod json_path;
pub mod local_cipher;
pub mod memory_store;
pub mod payload;
pub mod remote;
pub mod resource;
pub mod service_integration;
pub mod shell_env;

pub use deployer::SecretDeployer;
pub use error::{SecretError, SecretResult};
pub use json_file::JsonSecretFile;
pub use memory_store::MemoryStore;
pub use payload::{Base64JsonCodec, ObjectCodec, Payload};
pub use remote::{DeleteOptions, KeyCipher, ResourceStore, WriteSpec};
pub use resource::{
    DeployOutcome, DeployRequest, ParameterTier, RawValue, RemoteResource, ResourceKind, TagSet,
    UpdateMode, ValueType, WriteReceipt,
};
pub use service_integration::*;
pub use shell_env::EnvSecret;
