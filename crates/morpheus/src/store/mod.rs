//! Journal stores
//!
//! Each store owns one key-value slot holding a JSON array. Every mutation reads
//! the whole array, changes it in memory and writes the whole array back while
//! holding the slot's writer lock. The lock comes from the key-value store, so
//! every handle on the same slot serializes against the others.

pub mod dreams;
pub mod feedback;
pub mod memories;
pub mod settings;

pub use dreams::DreamStore;
pub use feedback::{FeedbackStats, FeedbackStore};
pub use memories::MemoryStore;
pub use settings::{NotificationSettings, SettingsStore, Theme};

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{MorpheusError, Result};
use crate::kv::KeyValueStore;

pub const DREAMS_KEY: &str = "dream_records";
pub const FEEDBACK_KEY: &str = "dream_feedback";
pub const MEMORIES_KEY: &str = "memory_records";
pub const THEME_KEY: &str = "appTheme";
pub const NOTIFICATIONS_KEY: &str = "notification_settings";
pub const LAST_BACKUP_KEY: &str = "lastBackupDate";

/// A JSON array in one key-value slot, guarded by a single-writer lock
pub(crate) struct JsonSlot<T> {
  kv: Arc<dyn KeyValueStore>,
  key: &'static str,
  lock: Arc<Mutex<()>>,
  _items: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonSlot<T> {
  fn clone(&self) -> Self {
    Self { kv: self.kv.clone(), key: self.key, lock: self.lock.clone(), _items: PhantomData }
  }
}

impl<T> JsonSlot<T>
where
  T: Serialize + DeserializeOwned + Send,
{
  pub(crate) fn new(kv: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
    let lock = kv.slot_lock(key);
    Self { kv, key, lock, _items: PhantomData }
  }

  pub(crate) fn key(&self) -> &'static str {
    self.key
  }

  async fn read_unlocked(&self) -> Result<Vec<T>> {
    match self.kv.get(self.key).await? {
      Some(raw) if !raw.trim().is_empty() => {
        serde_json::from_str(&raw).map_err(|e| MorpheusError::serialization(self.key, e))
      }
      _ => Ok(Vec::new()),
    }
  }

  async fn write_unlocked(&self, items: &[T]) -> Result<()> {
    let raw = serde_json::to_string(items).map_err(|e| MorpheusError::serialization(self.key, e))?;
    self.kv.set(self.key, &raw).await
  }

  /// Snapshot of the whole collection
  pub(crate) async fn load(&self) -> Result<Vec<T>> {
    let _guard = self.lock.lock().await;
    self.read_unlocked().await
  }

  /// Read-modify-write under the lock.
  ///
  /// The closure returns its result plus whether it changed the collection; an
  /// unchanged collection is not written back.
  pub(crate) async fn update<R, F>(&self, mutate: F) -> Result<R>
  where
    F: FnOnce(&mut Vec<T>) -> (R, bool),
  {
    let _guard = self.lock.lock().await;
    let mut items = self.read_unlocked().await?;
    let (result, changed) = mutate(&mut items);
    if changed {
      self.write_unlocked(&items).await?;
    }
    Ok(result)
  }

  /// Overwrite the collection wholesale
  pub(crate) async fn replace(&self, items: &[T]) -> Result<()> {
    let _guard = self.lock.lock().await;
    self.write_unlocked(items).await
  }

  /// Drop the slot entirely
  pub(crate) async fn clear(&self) -> Result<()> {
    let _guard = self.lock.lock().await;
    self.kv.remove(self.key).await
  }
}
