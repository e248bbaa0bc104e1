//! Journal statistics over a period

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::record::DreamRecord;

pub const TOP_WORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
  Week,
  Month,
  Year,
  #[default]
  All,
}

impl StatsPeriod {
  /// Earliest included date; `None` means no filter.
  ///
  /// Year applies no filter, same as all.
  fn since(&self, today: NaiveDate) -> Option<NaiveDate> {
    match self {
      StatsPeriod::Week => Some(today - Duration::days(7)),
      StatsPeriod::Month => Some(today - Duration::days(30)),
      StatsPeriod::Year | StatsPeriod::All => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
  pub word: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DreamStats {
  pub total_dreams: usize,
  /// Keyed by emotion tag, `none` for records without one
  pub emotion_counts: BTreeMap<String, usize>,
  /// Keyed by `YYYY-MM`
  pub monthly_counts: BTreeMap<String, usize>,
  pub average_confidence: f64,
  pub most_common_words: Vec<WordCount>,
  /// Dreams per week since the newest included record
  pub dream_frequency: f64,
}

impl DreamStats {
  /// `dreams` is expected newest first, as the store returns them
  pub fn compute(dreams: &[DreamRecord], period: StatsPeriod, today: NaiveDate) -> Self {
    let since = period.since(today);
    let included: Vec<&DreamRecord> =
      dreams.iter().filter(|d| since.map_or(true, |s| d.date >= s)).collect();

    let mut emotion_counts = BTreeMap::new();
    let mut monthly_counts = BTreeMap::new();
    for dream in &included {
      let tag = dream.emotion.map(|e| e.tag()).unwrap_or("none");
      *emotion_counts.entry(tag.to_string()).or_insert(0) += 1;
      *monthly_counts.entry(dream.date.format("%Y-%m").to_string()).or_insert(0) += 1;
    }

    let average_confidence = if included.is_empty() {
      0.0
    } else {
      included.iter().map(|d| d.confidence).sum::<f64>() / included.len() as f64
    };

    let dream_frequency = match included.first() {
      Some(newest) => {
        let days = (today - newest.date).num_days().max(1) as f64;
        included.len() as f64 / (days / 7.0)
      }
      None => 0.0,
    };

    Self {
      total_dreams: included.len(),
      emotion_counts,
      monthly_counts,
      average_confidence,
      most_common_words: common_words(&included),
      dream_frequency,
    }
  }
}

/// Words longer than two characters, most frequent first, ties by first appearance
fn common_words(dreams: &[&DreamRecord]) -> Vec<WordCount> {
  let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
  let mut order = 0;

  for dream in dreams {
    for word in dream.content.split(' ').filter(|w| w.chars().count() > 2) {
      let entry = counts.entry(word).or_insert_with(|| {
        order += 1;
        (0, order)
      });
      entry.0 += 1;
    }
  }

  let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
  ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
  ranked
    .into_iter()
    .take(TOP_WORDS)
    .map(|(word, (count, _))| WordCount { word: word.to_string(), count })
    .collect()
}
