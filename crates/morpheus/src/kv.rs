//! Key-value persistence abstraction
//!
//! Every journal collection lives in one string slot. The file adapter keeps one
//! `<key>.json` file per slot under the data directory; the in-memory adapter is
//! the test double.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{MorpheusError, Result};

/// Key-value slot storage interface
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Read a slot, `None` if it was never written or was removed
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Replace a slot's entire content
  async fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove a slot; removing a missing slot is not an error
  async fn remove(&self, key: &str) -> Result<()>;

  /// Writer lock for a slot, shared by every handle on this store
  fn slot_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>>;
}

/// One async mutex per slot key, created on first use
#[derive(Debug, Clone, Default)]
pub struct SlotLocks {
  locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SlotLocks {
  pub fn get(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
    locks.entry(key.to_string()).or_default().clone()
  }
}

fn validate_key(key: &str) -> Result<()> {
  let valid = !key.is_empty()
    && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if valid {
    Ok(())
  } else {
    Err(MorpheusError::InvalidInput(format!("invalid storage key '{key}'")))
  }
}

/// File-backed slots under a root directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
  root: PathBuf,
  locks: SlotLocks,
}

impl FileKeyValueStore {
  pub fn new<P: AsRef<Path>>(root: P) -> Self {
    Self { root: root.as_ref().to_path_buf(), locks: SlotLocks::default() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn slot_path(&self, key: &str) -> Result<PathBuf> {
    validate_key(key)?;
    Ok(self.root.join(format!("{key}.json")))
  }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let path = self.slot_path(key)?;
    match tokio::fs::read_to_string(&path).await {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(MorpheusError::storage(key, e)),
    }
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let path = self.slot_path(key)?;
    tokio::fs::create_dir_all(&self.root).await.map_err(|e| MorpheusError::storage(key, e))?;

    // Write-then-rename so a crash never leaves a half-written slot
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, value).await.map_err(|e| MorpheusError::storage(key, e))?;
    tokio::fs::rename(&tmp, &path).await.map_err(|e| MorpheusError::storage(key, e))?;

    tracing::debug!(key, bytes = value.len(), "slot written");
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let path = self.slot_path(key)?;
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(MorpheusError::storage(key, e)),
    }
  }

  fn slot_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
    self.locks.get(key)
  }
}

/// In-memory slots with injectable write failures
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
  slots: Mutex<HashMap<String, String>>,
  failing_keys: Mutex<HashSet<String>>,
  locks: SlotLocks,
}

impl MemoryKeyValueStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every subsequent `set`/`remove` on `key` fail
  pub fn fail_writes_to(&self, key: &str) {
    self.failing_keys.lock().unwrap_or_else(|p| p.into_inner()).insert(key.to_string());
  }

  pub fn heal(&self) {
    self.failing_keys.lock().unwrap_or_else(|p| p.into_inner()).clear();
  }

  /// Raw slot content, bypassing the async interface
  pub fn raw(&self, key: &str) -> Option<String> {
    self.slots.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned()
  }

  fn check_writable(&self, key: &str) -> Result<()> {
    if self.failing_keys.lock().unwrap_or_else(|p| p.into_inner()).contains(key) {
      return Err(MorpheusError::storage(key, "simulated write failure"));
    }
    Ok(())
  }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let value = self.raw(key);
    // Yield so unsynchronized read-modify-write callers would interleave
    tokio::task::yield_now().await;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    self.check_writable(key)?;
    self.slots.lock().unwrap_or_else(|p| p.into_inner()).insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    self.check_writable(key)?;
    self.slots.lock().unwrap_or_else(|p| p.into_inner()).remove(key);
    Ok(())
  }

  fn slot_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
    self.locks.get(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn test_file_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path().join("data"));

    assert_eq!(store.get("dream_records").await.unwrap(), None);

    store.set("dream_records", "[]").await.unwrap();
    assert_eq!(store.get("dream_records").await.unwrap().as_deref(), Some("[]"));
    assert!(temp.path().join("data").join("dream_records.json").exists());
    assert!(!temp.path().join("data").join("dream_records.json.tmp").exists());

    store.remove("dream_records").await.unwrap();
    assert_eq!(store.get("dream_records").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_file_store_remove_missing_is_ok() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path());

    store.remove("never_written").await.unwrap();
  }

  #[tokio::test]
  async fn test_file_store_rejects_path_like_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path());

    let err = store.set("../escape", "x").await.unwrap_err();
    assert!(matches!(err, MorpheusError::InvalidInput(_)));
    assert!(store.get("").await.is_err());
  }

  #[tokio::test]
  async fn test_memory_store_simulated_failure() {
    let store = MemoryKeyValueStore::new();
    store.set("dream_feedback", "[]").await.unwrap();

    store.fail_writes_to("dream_feedback");
    assert!(store.set("dream_feedback", "[1]").await.is_err());
    assert!(store.remove("dream_feedback").await.is_err());
    assert_eq!(store.raw("dream_feedback").as_deref(), Some("[]"));

    store.heal();
    store.set("dream_feedback", "[1]").await.unwrap();
    assert_eq!(store.get("dream_feedback").await.unwrap().as_deref(), Some("[1]"));
  }

  #[test]
  fn test_slot_lock_is_shared_per_key() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path());
    let cloned = store.clone();

    assert!(Arc::ptr_eq(&store.slot_lock("dream_records"), &cloned.slot_lock("dream_records")));
    assert!(!Arc::ptr_eq(&store.slot_lock("dream_records"), &store.slot_lock("dream_feedback")));

    let memory = MemoryKeyValueStore::new();
    assert!(Arc::ptr_eq(&memory.slot_lock("memory_records"), &memory.slot_lock("memory_records")));
  }
}
