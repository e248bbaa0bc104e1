//! Journal record types and their persisted JSON shape
//!
//! Field names are camelCase so blobs written by earlier app releases load unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MorpheusError, Result};
use crate::interpret::Interpretation;

/// Emotion felt during the dream (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
  Joy,
  Sadness,
  Fear,
  Anger,
  Surprise,
  Neutral,
}

impl Emotion {
  pub const ALL: [Emotion; 6] = [
    Emotion::Joy,
    Emotion::Sadness,
    Emotion::Fear,
    Emotion::Anger,
    Emotion::Surprise,
    Emotion::Neutral,
  ];

  pub fn tag(&self) -> &'static str {
    match self {
      Emotion::Joy => "joy",
      Emotion::Sadness => "sadness",
      Emotion::Fear => "fear",
      Emotion::Anger => "anger",
      Emotion::Surprise => "surprise",
      Emotion::Neutral => "neutral",
    }
  }

  /// Human-readable label used in remote prompts
  pub fn label(&self) -> &'static str {
    match self {
      Emotion::Joy => "기쁨",
      Emotion::Sadness => "슬픔",
      Emotion::Fear => "두려움",
      Emotion::Anger => "분노",
      Emotion::Surprise => "놀람",
      Emotion::Neutral => "평온함",
    }
  }

  /// Descriptive phrase appended by the keyword interpreter
  pub fn phrase(&self) -> &'static str {
    match self {
      Emotion::Joy => "기쁘고 행복한",
      Emotion::Sadness => "슬프고 우울한",
      Emotion::Fear => "불안하고 두려운",
      Emotion::Anger => "화가 나고 짜증스러운",
      Emotion::Surprise => "놀라고 당황한",
      Emotion::Neutral => "평온한",
    }
  }

  pub fn emoji(&self) -> &'static str {
    match self {
      Emotion::Joy => "😊",
      Emotion::Sadness => "😢",
      Emotion::Fear => "😨",
      Emotion::Anger => "😠",
      Emotion::Surprise => "😲",
      Emotion::Neutral => "😌",
    }
  }
}

impl fmt::Display for Emotion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

impl FromStr for Emotion {
  type Err = MorpheusError;

  fn from_str(s: &str) -> Result<Self> {
    Emotion::ALL
      .into_iter()
      .find(|e| e.tag() == s.trim().to_lowercase())
      .ok_or_else(|| MorpheusError::InvalidInput(format!("unknown emotion '{s}'")))
  }
}

/// Stored emotion tags use "" for "no emotion selected"
mod emotion_tag {
  use super::Emotion;
  use serde::{de::Error, Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Option<Emotion>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.map(|e| e.tag()).unwrap_or(""))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Emotion>, D::Error> {
    let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
    if raw.is_empty() {
      return Ok(None);
    }
    raw.parse().map(Some).map_err(D::Error::custom)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DreamType {
  Normal,
  Lucid,
  Nightmare,
  Recurring,
}

/// One persisted interpretation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamRecord {
  pub id: String,
  pub content: String,
  #[serde(with = "emotion_tag", default)]
  pub emotion: Option<Emotion>,
  pub interpretation: String,
  pub date: NaiveDate,
  pub confidence: f64,
  #[serde(default)]
  pub recommendations: Vec<String>,

  // Journal fields, carried through storage and backups but never filled in by the app
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vividness: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mood_before: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mood_after: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sleep_quality: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dream_type: Option<DreamType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl DreamRecord {
  /// Build the record persisted after an interpretation completes
  pub fn from_interpretation(
    now: DateTime<Utc>,
    content: &str,
    emotion: Option<Emotion>,
    result: &Interpretation,
  ) -> Self {
    Self {
      id: time_token(now),
      content: content.to_string(),
      emotion,
      interpretation: result.interpretation.clone(),
      date: now.date_naive(),
      confidence: result.confidence,
      recommendations: result.recommendations.clone(),
      vividness: None,
      mood_before: None,
      mood_after: None,
      sleep_quality: None,
      dream_type: None,
      tags: None,
      notes: None,
    }
  }
}

/// A user's rating of one interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub dream_id: String,
  pub is_accurate: bool,
  pub helpfulness: u8,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suggestions: Option<String>,
  pub timestamp: DateTime<Utc>,
}

impl Feedback {
  pub fn new(
    dream_id: &str,
    is_accurate: bool,
    helpfulness: u8,
    suggestions: Option<String>,
  ) -> Result<Self> {
    if !(1..=5).contains(&helpfulness) {
      return Err(MorpheusError::InvalidInput(format!(
        "helpfulness must be between 1 and 5, got {helpfulness}"
      )));
    }

    Ok(Self {
      dream_id: dream_id.to_string(),
      is_accurate,
      helpfulness,
      suggestions: suggestions.filter(|s| !s.trim().is_empty()),
      timestamp: Utc::now(),
    })
  }

  /// Thumbs up / thumbs down shortcut: helpful maps to 5, unhelpful to 1
  pub fn quick(dream_id: &str, helpful: bool) -> Self {
    Self {
      dream_id: dream_id.to_string(),
      is_accurate: helpful,
      helpfulness: if helpful { 5 } else { 1 },
      suggestions: None,
      timestamp: Utc::now(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
  InProgress,
  Completed,
  Failed,
}

/// A guided memory-recovery session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
  pub id: String,
  pub description: String,
  pub clues: Vec<String>,
  pub status: MemoryStatus,
  pub date: NaiveDate,
  #[serde(default, rename = "aiAnalysis", skip_serializing_if = "Option::is_none")]
  pub analysis: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recovered_memory: Option<String>,
}

/// Millisecond creation-time token used as a record identifier
pub fn time_token(now: DateTime<Utc>) -> String {
  now.timestamp_millis().to_string()
}

/// Smallest token >= `token` not already taken.
///
/// Non-numeric tokens get a numeric suffix instead.
pub fn next_free_token<F>(token: &str, taken: F) -> String
where
  F: Fn(&str) -> bool,
{
  if !taken(token) {
    return token.to_string();
  }

  match token.parse::<i64>() {
    Ok(mut n) => loop {
      n += 1;
      let candidate = n.to_string();
      if !taken(&candidate) {
        return candidate;
      }
    },
    Err(_) => {
      let mut suffix = 1u32;
      loop {
        let candidate = format!("{token}-{suffix}");
        if !taken(&candidate) {
          return candidate;
        }
        suffix += 1;
      }
    }
  }
}
