use std::sync::Arc;

use super::{JsonSlot, DREAMS_KEY};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::record::{next_free_token, DreamRecord};

/// Dream records, newest first
#[derive(Clone)]
pub struct DreamStore {
  slot: JsonSlot<DreamRecord>,
}

impl DreamStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { slot: JsonSlot::new(kv, DREAMS_KEY) }
  }

  /// Prepend a record and return it as stored.
  ///
  /// If another record already owns the id (two records created in the same
  /// millisecond) the new record is moved to the next free token.
  pub async fn append(&self, mut record: DreamRecord) -> Result<DreamRecord> {
    let stored = self
      .slot
      .update(|dreams| {
        record.id = next_free_token(&record.id, |id| dreams.iter().any(|d| d.id == id));
        dreams.insert(0, record.clone());
        (record, true)
      })
      .await?;

    tracing::debug!(id = %stored.id, key = self.slot.key(), "dream appended");
    Ok(stored)
  }

  pub async fn list(&self) -> Result<Vec<DreamRecord>> {
    self.slot.load().await
  }

  pub async fn get(&self, id: &str) -> Result<Option<DreamRecord>> {
    Ok(self.list().await?.into_iter().find(|d| d.id == id))
  }

  /// Remove the record with `id`; returns whether one was removed.
  ///
  /// Unknown ids leave the stored collection untouched.
  pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
    let removed = self
      .slot
      .update(|dreams| {
        let before = dreams.len();
        dreams.retain(|d| d.id != id);
        let removed = dreams.len() != before;
        (removed, removed)
      })
      .await?;

    tracing::debug!(id, removed, "dream delete");
    Ok(removed)
  }

  pub async fn clear(&self) -> Result<()> {
    self.slot.clear().await
  }

  /// Overwrite all records, order preserved (used by backup restore)
  pub async fn replace_all(&self, dreams: &[DreamRecord]) -> Result<()> {
    self.slot.replace(dreams).await
  }
}
