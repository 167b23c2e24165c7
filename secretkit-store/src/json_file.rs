//! Local JSON secret file
//!
//! A single JSON document on disk, read and written whole. Values inside it
//! are addressed with dotted paths.
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
use crate::payload;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_FILE_NAME: &str = ".secretkit.json";

/// JSON document backed by a local file
#[derive(Debug, Clone)]
pub struct JsonSecretFile {
    path: PathBuf,
    data: Value,
}

impl JsonSecretFile {
    /// `~/.secretkit.json`
    pub fn default_path() -> SecretResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_FILE_NAME))
            .ok_or_else(|| {
                SecretError::Configuration("Could not determine home directory".to_string())
            })
    }

    /// Load the file at `path`, creating it as `{}` when absent
    pub async fn open(path: impl AsRef<Path>) -> SecretResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !fs::try_exists(&path).await? {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, "{}").await?;
            info!(path = %path.display(), "Created empty secret file");
            return Ok(Self {
                path,
                data: Value::Object(Map::new()),
            });
        }

        let content = fs::read_to_string(&path).await?;
        let data = if content.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            payload::parse_json(&content)?
        };
        debug!(path = %path.display(), "Loaded secret file");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Read the value at `path`
    pub fn get(&self, path: &str) -> SecretResult<&Value> {
        json_path::get_value(&self.data, path)
    }

    /// Set the value at `path` and persist the file
    pub async fn set(&mut self, path: &str, value: Value) -> SecretResult<()> {
        self.data = json_path::set_value(self.data.clone(), path, value)?;
        self.save().await
    }

    /// Remove the value at `path` and persist the file
    pub async fn unset(&mut self, path: &str) -> SecretResult<Value> {
        let removed = json_path::delete_value(&mut self.data, path)?;
        self.save().await?;
        Ok(removed)
    }

    async fn save(&self) -> SecretResult<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "Saved secret file");
        Ok(())
    }
}
