// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Persistent per-script key/value storage
//!
//! Each script owns one JSON document at `<data>/<script>.json`. Keys are
//! dotted paths into nested objects: `balance.alice` addresses
//! `{"balance": {"alice": ...}}`.

use crate::error::Result;
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A script's storage document
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    root: Map<String, Json>,
    dirty: bool,
}

impl Storage {
    /// Open the document at `path`. A missing file starts empty; an
    /// unreadable or malformed one logs a warning and starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Json>(&text) {
                Ok(Json::Object(map)) => map,
                Ok(_) => {
                    warn!(path = %path.display(), "storage document is not an object, starting empty");
                    Map::new()
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not parse storage document");
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read storage document");
                Map::new()
            }
        };
        debug!(path = %path.display(), keys = root.len(), "opened storage");
        Self {
            path,
            root,
            dirty: false,
        }
    }

    /// Where the document is written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read the value at `key`
    pub fn get(&self, key: &str) -> Option<&Json> {
        let (parents, last) = split(key);
        let mut current = &self.root;
        for part in parents {
            current = current.get(part)?.as_object()?;
        }
        current.get(last)
    }

    /// Whether `key` holds a non-null value
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    /// Write `value` at `key`, creating (or replacing non-object)
    /// intermediate objects
    pub fn set(&mut self, key: &str, value: Json) {
        let (parents, last) = split(key);
        let mut current = &mut self.root;
        for part in parents {
            let slot = current.entry(part.to_string()).or_insert(Json::Null);
            if !slot.is_object() {
                *slot = Json::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value);
        self.dirty = true;
    }

    /// Remove `key`. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let (parents, last) = split(key);
        let mut current = &mut self.root;
        for part in parents {
            match current.get_mut(part) {
                Some(Json::Object(next)) => current = next,
                _ => return false,
            }
        }
        let removed = current.shift_remove(last).is_some();
        self.dirty |= removed;
        removed
    }

    /// Keys of the object at `prefix`, or of the whole document
    pub fn keys(&self, prefix: Option<&str>) -> Vec<String> {
        let target = match prefix {
            Some(prefix) => self.get(prefix).and_then(Json::as_object),
            None => Some(&self.root),
        };
        target.map(|map| map.keys().cloned().collect()).unwrap_or_default()
    }

    /// Add `amount` to the number at `key` (missing or non-numeric counts
    /// as zero) and return the result
    pub fn increment(&mut self, key: &str, amount: f64) -> f64 {
        let current = self.get(key).and_then(Json::as_f64).unwrap_or(0.0);
        let updated = current + amount;
        self.set(key, number(updated));
        updated
    }

    /// Append `value` to the array at `key`, replacing a non-array, and
    /// return the new length
    pub fn push(&mut self, key: &str, value: Json) -> usize {
        let mut items = match self.get(key) {
            Some(Json::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        items.push(value);
        let len = items.len();
        self.set(key, Json::Array(items));
        len
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.root.clear();
        self.dirty = true;
    }

    /// The whole document as pretty-printed JSON
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.root).unwrap_or_else(|_| "{}".to_string())
    }

    /// Write the document if it has unsaved changes
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Write the document unconditionally
    pub fn save(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, self.to_pretty())?;
        self.dirty = false;
        debug!(path = %self.path.display(), "saved storage");
        Ok(())
    }
}

fn split(key: &str) -> (impl Iterator<Item = &str>, &str) {
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, key),
    };
    (parents.into_iter().flat_map(|parents| parents.split('.')), last)
}

/// Integral values are stored as JSON integers
fn number(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("data/test.json"));
        (dir, storage)
    }

    #[test]
    fn test_dotted_paths() {
        let (_dir, mut storage) = scratch();
        storage.set("balance.alice", json!(10));
        storage.set("balance.bob", json!(5));
        assert_eq!(storage.get("balance.alice"), Some(&json!(10)));
        assert_eq!(storage.get("balance"), Some(&json!({ "alice": 10, "bob": 5 })));
        assert_eq!(storage.keys(Some("balance")), ["alice", "bob"]);
        assert_eq!(storage.keys(None), ["balance"]);
        assert!(storage.get("balance.carol").is_none());
        assert!(storage.get("missing.deep.key").is_none());
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let (_dir, mut storage) = scratch();
        storage.set("a", json!(1));
        storage.set("a.b", json!(2));
        assert_eq!(storage.get("a"), Some(&json!({ "b": 2 })));
    }

    #[test]
    fn test_delete_and_has() {
        let (_dir, mut storage) = scratch();
        storage.set("x.y", json!(null));
        assert!(!storage.has("x.y"));
        storage.set("x.y", json!("v"));
        assert!(storage.has("x.y"));
        assert!(storage.delete("x.y"));
        assert!(!storage.delete("x.y"));
        assert!(!storage.delete("nope.y"));
    }

    #[test]
    fn test_increment_and_push() {
        let (_dir, mut storage) = scratch();
        assert_eq!(storage.increment("hits", 1.0), 1.0);
        assert_eq!(storage.increment("hits", 2.5), 3.5);
        assert_eq!(storage.increment("name", -1.0), -1.0);
        assert_eq!(storage.get("name"), Some(&json!(-1)));

        assert_eq!(storage.push("log", json!("a")), 1);
        assert_eq!(storage.push("log", json!("b")), 2);
        assert_eq!(storage.get("log"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_flush_only_when_dirty() {
        let (dir, mut storage) = scratch();
        assert!(!storage.flush().unwrap());
        storage.set("k", json!(true));
        assert!(storage.is_dirty());
        assert!(storage.flush().unwrap());
        assert!(!storage.is_dirty());

        let reopened = Storage::open(dir.path().join("data/test.json"));
        assert_eq!(reopened.get("k"), Some(&json!(true)));
    }

    #[test]
    fn test_malformed_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let storage = Storage::open(&path);
        assert!(storage.keys(None).is_empty());
        assert!(!storage.is_dirty());
    }
}
