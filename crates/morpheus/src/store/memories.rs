use std::sync::Arc;

use super::{JsonSlot, MEMORIES_KEY};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::record::{next_free_token, MemoryRecord};

/// Memory-recovery sessions, newest first
#[derive(Clone)]
pub struct MemoryStore {
  slot: JsonSlot<MemoryRecord>,
}

impl MemoryStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { slot: JsonSlot::new(kv, MEMORIES_KEY) }
  }

  pub async fn append(&self, mut record: MemoryRecord) -> Result<MemoryRecord> {
    self
      .slot
      .update(|memories| {
        record.id = next_free_token(&record.id, |id| memories.iter().any(|m| m.id == id));
        memories.insert(0, record.clone());
        (record, true)
      })
      .await
  }

  pub async fn list(&self) -> Result<Vec<MemoryRecord>> {
    self.slot.load().await
  }

  pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
    self
      .slot
      .update(|memories| {
        let before = memories.len();
        memories.retain(|m| m.id != id);
        let removed = memories.len() != before;
        (removed, removed)
      })
      .await
  }

  pub async fn clear(&self) -> Result<()> {
    self.slot.clear().await
  }
}
