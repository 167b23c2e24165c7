//! Shell profile helpers
//!
//! Secrets exported as environment variables live in a small shell script
//! made of `export KEY="VALUE"` lines, sourced from the user's profile.
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
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const DEFAULT_SCRIPT_NAME: &str = ".bashrc_secretkit";

static EXPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^export ([A-Za-z0-9_]{1,128})="(.{1,128})"$"#).expect("export pattern is valid")
});

static VAR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,128}$").expect("name pattern is valid"));

/// `export VAR="VALUE"`
pub fn export_line(var: &str, value: &str) -> String {
    format!("export {}=\"{}\"", var, value)
}

/// Collect the variables assigned by well-formed export lines.
///
/// Lines are matched as-is: indentation, trailing comments and spaces around
/// `=` make a line invalid.
pub fn parse_exports(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| EXPORT_LINE.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Parse the export lines of a script, empty when the file is absent
pub async fn load_exports(path: impl AsRef<Path>) -> SecretResult<BTreeMap<String, String>> {
    let path = path.as_ref();
    if !fs::try_exists(path).await? {
        return Ok(BTreeMap::new());
    }
    Ok(parse_exports(&fs::read_to_string(path).await?))
}

/// Deserialize the exports of a script into `T`.
///
/// Each variable becomes a string field of a JSON object, so `T` reads
/// its fields by variable name. Missing variables fail unless the field is
/// optional or defaulted.
pub async fn load_typed<T: DeserializeOwned>(path: impl AsRef<Path>) -> SecretResult<T> {
    let object: Map<String, Value> = load_exports(path)
        .await?
        .into_iter()
        .map(|(var, value)| (var, Value::String(value)))
        .collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Append `line` to the file unless an existing line already contains it.
///
/// The file is created when absent. Returns whether the line was written.
pub async fn append_line_if_not_exists(path: impl AsRef<Path>, line: &str) -> SecretResult<bool> {
    let path = path.as_ref();
    if line.contains('\n') {
        return Err(SecretError::InvalidArgument(format!(
            "{:?} spans more than one line",
            line
        )));
    }

    let content = if fs::try_exists(path).await? {
        fs::read_to_string(path).await?
    } else {
        String::new()
    };

    let needle = line.trim();
    if content.lines().any(|existing| existing.contains(needle)) {
        debug!(path = %path.display(), "Line already present");
        return Ok(false);
    }

    let text = if content.is_empty() || content.ends_with('\n') {
        format!("{}\n", line)
    } else {
        format!("\n{}\n", line)
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    Ok(true)
}

/// Shell startup files that can source the secret script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellProfile {
    Bashrc,
    BashProfile,
    Zshrc,
    FishConfig,
}

impl ShellProfile {
    /// Location of the profile under `home`
    pub fn path_in(&self, home: &Path) -> PathBuf {
        match self {
            ShellProfile::Bashrc => home.join(".bashrc"),
            ShellProfile::BashProfile => home.join(".bash_profile"),
            ShellProfile::Zshrc => home.join(".zshrc"),
            ShellProfile::FishConfig => home.join(".config").join("fish").join("config.fish"),
        }
    }
}

/// Secrets kept in environment variables, persisted to a shell script
#[derive(Debug, Clone)]
pub struct EnvSecret {
    script_path: PathBuf,
}

impl EnvSecret {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
        }
    }

    /// `~/.bashrc_secretkit`
    pub fn default_path() -> SecretResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_SCRIPT_NAME))
            .ok_or_else(|| {
                SecretError::Configuration("Could not determine home directory".to_string())
            })
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Set `var` in this process and, unless `temp`, persist it to the script.
    ///
    /// `var` must be 1 to 128 ASCII letters, digits or underscores. A value
    /// the script cannot hold (empty, longer than 128 characters or spanning
    /// lines) is still set in this process but not persisted.
    pub async fn set(&self, var: &str, value: &str, temp: bool) -> SecretResult<()> {
        if !VAR_NAME.is_match(var) {
            return Err(SecretError::InvalidArgument(format!(
                "{:?} is not a valid variable name",
                var
            )));
        }
        if value.contains('\0') {
            return Err(SecretError::InvalidArgument(format!(
                "value of {} contains a NUL byte",
                var
            )));
        }

        env::set_var(var, value);
        if temp {
            return Ok(());
        }

        let line = export_line(var, value);
        if !EXPORT_LINE.is_match(&line) {
            warn!(var = %var, "Value cannot be written as an export line, not persisted");
            return Ok(());
        }
        if append_line_if_not_exists(&self.script_path, &line).await? {
            info!(var = %var, path = %self.script_path.display(), "Persisted environment secret");
        }
        Ok(())
    }

    pub fn get(&self, var: &str) -> SecretResult<String> {
        env::var(var).map_err(|_| SecretError::NotFound(var.to_string()))
    }

    /// Export every variable of the script into this process
    pub async fn load_script(&self) -> SecretResult<BTreeMap<String, String>> {
        let exports = load_exports(&self.script_path).await?;
        for (var, value) in &exports {
            env::set_var(var, value);
        }
        debug!(
            count = exports.len(),
            path = %self.script_path.display(),
            "Loaded environment secrets"
        );
        Ok(exports)
    }

    /// Deserialize the script's exports into `T` without touching this process
    pub async fn load_as<T: DeserializeOwned>(&self) -> SecretResult<T> {
        load_typed(&self.script_path).await
    }

    pub fn source_command(&self) -> String {
        format!("source {}", self.script_path.display())
    }

    /// Make `profile` source the script, returning whether it was changed
    pub async fn apply_source_to(&self, profile: impl AsRef<Path>) -> SecretResult<bool> {
        let profile = profile.as_ref();
        if let Some(parent) = profile.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        append_line_if_not_exists(profile, &self.source_command()).await
    }
}
