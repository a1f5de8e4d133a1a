// Copyright 2025 Chris Custine
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

//! Storage backends for the persisted affinity cache blob.
//!
//! The cache is persisted as a single serialized blob, read whole once at
//! startup and written whole on every mutation. Backends only move opaque
//! strings; scoring and structure live in the cache itself.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

const APP_DIR: &str = "skytrack";
const CACHE_FILE: &str = "affinity_cache.json";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no platform data directory available")]
    NoDataDir,
}

/// A place to keep the serialized cache blob.
pub trait CacheStorage: Send {
    /// Read the whole blob; `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Write the whole blob, replacing any previous contents.
    fn save(&self, blob: &str) -> Result<(), StorageError>;

    /// Remove the persisted blob entirely.
    fn clear(&self) -> Result<(), StorageError>;
}

/// File-backed storage under the platform data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create storage at the default location
    /// (`<data_dir>/skytrack/affinity_cache.json`).
    pub fn new() -> Result<Self, StorageError> {
        let dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?.join(APP_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join(CACHE_FILE),
        })
    }

    /// Create storage at an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the persisted blob.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CacheStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, blob: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, blob)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded storage, for exercising the load path.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl CacheStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .blob
            .lock()
            .expect("Cache storage lock poisoned - unrecoverable state")
            .clone())
    }

    fn save(&self, blob: &str) -> Result<(), StorageError> {
        *self
            .blob
            .lock()
            .expect("Cache storage lock poisoned - unrecoverable state") = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self
            .blob
            .lock()
            .expect("Cache storage lock poisoned - unrecoverable state") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_path(dir.path().join("cache.json"));

        assert!(storage.load().unwrap().is_none());

        storage.save(r#"{"favorites":[]}"#).unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some(r#"{"favorites":[]}"#));

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn file_storage_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_path(dir.path().join("cache.json"));

        storage.clear().unwrap();
        storage.clear().unwrap();
    }

    #[test]
    fn file_storage_creates_missing_parent_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_path(dir.path().join("nested").join("cache.json"));

        storage.save("{}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());

        storage.save("blob").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("blob"));

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }
}
