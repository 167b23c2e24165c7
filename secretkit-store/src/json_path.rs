//! Dotted-path access into JSON documents
//!
//! A path is a `.` separated list of keys, optionally with one leading `.`
//! meaning "from the root". The path `"."` addresses the whole document.
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
use serde_json::{Map, Value};

/// Split a path into its key segments.
///
/// An empty result addresses the document root.
fn segments(path: &str) -> SecretResult<Vec<&str>> {
    let relative = path.strip_prefix('.').unwrap_or(path);
    if relative.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = relative.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(SecretError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn joined(segments: &[&str]) -> String {
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join(".")
    }
}

/// Read the value at `path`
pub fn get_value<'a>(document: &'a Value, path: &str) -> SecretResult<&'a Value> {
    let segments = segments(path)?;

    let mut current = document;
    for (i, key) in segments.iter().enumerate() {
        current = current
            .as_object()
            .and_then(|map| map.get(*key))
            .ok_or_else(|| SecretError::KeyNotFound(joined(&segments[..=i])))?;
    }
    Ok(current)
}

/// Write `value` at `path` and return the resulting document.
///
/// Missing intermediate keys are created as empty mappings. An intermediate
/// that exists but is not a mapping is an error, it is never replaced.
/// Writing to the root path returns `value` itself.
pub fn set_value(mut document: Value, path: &str, value: Value) -> SecretResult<Value> {
    let segments = segments(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(value);
    };

    let mut current = &mut document;
    for (i, key) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => map
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return Err(SecretError::NotAMapping(joined(&segments[..i]))),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
        }
        _ => return Err(SecretError::NotAMapping(joined(parents))),
    }
    Ok(document)
}

/// Remove the key at `path` and return the removed value
pub fn delete_value(document: &mut Value, path: &str) -> SecretResult<Value> {
    let segments = segments(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(SecretError::InvalidPath(format!(
            "cannot delete the document root ({path:?})"
        )));
    };

    let mut current = document;
    for (i, key) in parents.iter().enumerate() {
        current = current
            .as_object_mut()
            .and_then(|map| map.get_mut(*key))
            .ok_or_else(|| SecretError::KeyNotFound(joined(&segments[..=i])))?;
    }

    current
        .as_object_mut()
        .and_then(|map| map.remove(*last))
        .ok_or_else(|| SecretError::KeyNotFound(joined(&segments)))
}
