//! Dream interpretation engines
//!
//! Two engines share one output shape: a keyword table that runs locally and an
//! LLM-backed engine that talks to an OpenAI-compatible endpoint. Neither ever
//! fails; the remote engine degrades to a fixed fallback and says so in
//! [`Interpretation::outcome`].

pub mod completion;
pub mod remote;
pub mod rules;

pub use completion::{CompletionClient, CompletionRequest, OpenAiCompletionClient};
pub use remote::RemoteInterpreter;
pub use rules::RuleBasedInterpreter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::Emotion;

/// Theme reported when nothing more specific was identified
pub const GENERAL_THEME: &str = "general";

/// Recommendations used when the remote reply carries none, and by the fallback
pub const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
  "꿈의 내용을 일기에 기록해보세요",
  "현재 상황을 객관적으로 바라보세요",
  "신뢰할 수 있는 사람과 대화해보세요",
];

const FALLBACK_TEXT: &str = "죄송합니다. 현재 AI 서비스에 일시적인 문제가 있습니다. 꿈은 우리의 무의식이 전달하는 중요한 메시지입니다. 꿈의 내용을 자세히 기록하고, 현재 상황과 연결지어 생각해보시기 바랍니다.";

/// Which path produced an interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretationOutcome {
  /// Keyword table
  Local,
  /// Parsed remote reply
  Remote,
  /// Remote call failed, fixed placeholder returned
  Fallback,
}

impl InterpretationOutcome {
  pub fn as_str(&self) -> &'static str {
    match self {
      InterpretationOutcome::Local => "local",
      InterpretationOutcome::Remote => "remote",
      InterpretationOutcome::Fallback => "fallback",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
  pub themes: Vec<String>,
  pub interpretation: String,
  /// Heuristic score in [0, 1]
  pub confidence: f64,
  pub recommendations: Vec<String>,
  pub outcome: InterpretationOutcome,
}

impl Interpretation {
  /// Placeholder returned whenever the remote engine cannot complete its call
  pub fn fallback() -> Self {
    Self {
      themes: vec![GENERAL_THEME.to_string()],
      interpretation: FALLBACK_TEXT.to_string(),
      confidence: 0.3,
      recommendations: default_recommendations(),
      outcome: InterpretationOutcome::Fallback,
    }
  }

  pub fn is_fallback(&self) -> bool {
    self.outcome == InterpretationOutcome::Fallback
  }

  /// First theme, or the general sentinel
  pub fn primary_theme(&self) -> &str {
    self.themes.first().map(String::as_str).unwrap_or(GENERAL_THEME)
  }
}

pub(crate) fn default_recommendations() -> Vec<String> {
  DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
}

/// Interpretation engine interface
#[async_trait]
pub trait Interpreter: Send + Sync {
  /// Interpret a dream; engines absorb their own failures
  async fn interpret(&self, content: &str, emotion: Option<Emotion>) -> Interpretation;

  /// Short engine name for logs
  fn name(&self) -> &'static str;
}
