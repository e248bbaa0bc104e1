use serde::Serialize;
use std::sync::Arc;

use super::{JsonSlot, FEEDBACK_KEY};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::record::Feedback;

/// Aggregate over all feedback entries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeedbackStats {
  pub total_feedback: usize,
  /// Percentage of entries marked accurate (0-100)
  pub accuracy_rate: f64,
  pub average_helpfulness: f64,
}

impl FeedbackStats {
  pub fn from_entries(entries: &[Feedback]) -> Self {
    if entries.is_empty() {
      return Self::default();
    }

    let total = entries.len() as f64;
    let accurate = entries.iter().filter(|f| f.is_accurate).count() as f64;
    let helpfulness: f64 = entries.iter().map(|f| f64::from(f.helpfulness)).sum();

    Self {
      total_feedback: entries.len(),
      accuracy_rate: accurate / total * 100.0,
      average_helpfulness: helpfulness / total,
    }
  }
}

/// Append-only feedback log, insertion order
#[derive(Clone)]
pub struct FeedbackStore {
  slot: JsonSlot<Feedback>,
}

impl FeedbackStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { slot: JsonSlot::new(kv, FEEDBACK_KEY) }
  }

  /// The referenced dream is not checked for existence
  pub async fn append(&self, feedback: Feedback) -> Result<()> {
    self
      .slot
      .update(|entries| {
        entries.push(feedback);
        ((), true)
      })
      .await
  }

  pub async fn list(&self) -> Result<Vec<Feedback>> {
    self.slot.load().await
  }

  /// First feedback recorded for a dream
  pub async fn for_dream(&self, dream_id: &str) -> Result<Option<Feedback>> {
    Ok(self.list().await?.into_iter().find(|f| f.dream_id == dream_id))
  }

  pub async fn stats(&self) -> Result<FeedbackStats> {
    Ok(FeedbackStats::from_entries(&self.list().await?))
  }

  pub async fn clear(&self) -> Result<()> {
    self.slot.clear().await
  }

  pub async fn replace_all(&self, entries: &[Feedback]) -> Result<()> {
    self.slot.replace(entries).await
  }
}
