//! LLM-backed interpreter
//!
//! Sends one chat completion asking for a four-section answer (themes,
//! psychological reading, advice, confidence) and parses the labelled lines
//! back out. Any failure, including the timeout, yields [`Interpretation::fallback`].

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use super::completion::{CompletionClient, CompletionRequest};
use super::{default_recommendations, Interpretation, InterpretationOutcome, Interpreter, GENERAL_THEME};
use crate::config::RemoteConfig;
use crate::record::Emotion;

pub const SYSTEM_PROMPT: &str = "당신은 전문적인 꿈 해석가입니다. 꿈의 내용을 분석하여 심리적 의미와 해석을 제공하고, 실용적인 조언을 드립니다. 한국어로 답변해주세요.";

const ANSWER_FORMAT: &str = "다음 형식으로 답변해주세요:
1. 주요 테마: 꿈의 핵심 주제
2. 심리적 해석: 꿈이 나타내는 심리적 의미
3. 조언: 실생활에 적용할 수 있는 구체적인 조언 3가지
4. 신뢰도: 해석의 신뢰도 (0-100%)";

const THEME_LABELS: [&str; 2] = ["주요 테마:", "테마:"];
const INTERPRETATION_LABELS: [&str; 2] = ["심리적 해석:", "해석:"];
const ADVICE_LABELS: [&str; 2] = ["조언:", "추천:"];
const CONFIDENCE_LABELS: [&str; 1] = ["신뢰도:"];

const DEFAULT_REMOTE_CONFIDENCE: f64 = 0.8;

static PERCENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\d+)%").ok());

pub struct RemoteInterpreter {
  client: Arc<dyn CompletionClient>,
  temperature: f64,
  max_tokens: u32,
  timeout: Duration,
}

impl RemoteInterpreter {
  pub fn new(client: Arc<dyn CompletionClient>, config: &RemoteConfig) -> Self {
    Self {
      client,
      temperature: config.temperature,
      max_tokens: config.max_tokens,
      timeout: Duration::from_secs(config.timeout_secs),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build_request(&self, content: &str, emotion: Option<Emotion>) -> CompletionRequest {
    CompletionRequest {
      system: SYSTEM_PROMPT.to_string(),
      user: build_prompt(content, emotion),
      temperature: self.temperature,
      max_tokens: self.max_tokens,
    }
  }
}

pub fn build_prompt(content: &str, emotion: Option<Emotion>) -> String {
  let mut prompt = format!("다음 꿈에 대해 분석해주세요:\n\n꿈 내용: {content}\n\n");
  if let Some(emotion) = emotion {
    prompt.push_str(&format!("꿈에서 느낀 감정: {}\n\n", emotion.label()));
  }
  prompt.push_str(ANSWER_FORMAT);
  prompt
}

fn has_label(line: &str, labels: &[&str]) -> bool {
  labels.iter().any(|label| line.contains(label))
}

/// Segment between the first and second colon, trimmed
fn label_value(line: &str) -> &str {
  line.split(':').nth(1).unwrap_or("").trim()
}

fn split_list(value: &str) -> Vec<String> {
  value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_percent(value: &str) -> Option<f64> {
  let captures = PERCENT.as_ref()?.captures(value)?;
  let n: f64 = captures.get(1)?.as_str().parse().ok()?;
  Some((n / 100.0).clamp(0.0, 1.0))
}

/// Parse a labelled reply; a later line with the same label overrides an earlier one
pub fn parse_response(response: &str) -> Interpretation {
  let mut themes = Vec::new();
  let mut interpretation = String::new();
  let mut recommendations = Vec::new();
  let mut confidence = DEFAULT_REMOTE_CONFIDENCE;

  for line in response.lines().filter(|l| !l.trim().is_empty()) {
    if has_label(line, &THEME_LABELS) {
      themes = split_list(label_value(line));
    } else if has_label(line, &INTERPRETATION_LABELS) {
      interpretation = label_value(line).to_string();
    } else if has_label(line, &ADVICE_LABELS) {
      recommendations = split_list(label_value(line));
    } else if has_label(line, &CONFIDENCE_LABELS) {
      if let Some(value) = parse_percent(label_value(line)) {
        confidence = value;
      }
    }
  }

  if interpretation.is_empty() {
    interpretation = response.to_string();
  }
  if recommendations.is_empty() {
    recommendations = default_recommendations();
  }
  if themes.is_empty() {
    themes = vec![GENERAL_THEME.to_string()];
  }

  Interpretation { themes, interpretation, confidence, recommendations, outcome: InterpretationOutcome::Remote }
}

#[async_trait]
impl Interpreter for RemoteInterpreter {
  async fn interpret(&self, content: &str, emotion: Option<Emotion>) -> Interpretation {
    let request = self.build_request(content, emotion);

    match tokio::time::timeout(self.timeout, self.client.complete(&request)).await {
      Ok(Ok(response)) => parse_response(&response),
      Ok(Err(e)) => {
        tracing::warn!(error = %e, "remote interpretation failed, using fallback");
        Interpretation::fallback()
      }
      Err(_) => {
        tracing::warn!(timeout_secs = self.timeout.as_secs_f64(), "remote interpretation timed out, using fallback");
        Interpretation::fallback()
      }
    }
  }

  fn name(&self) -> &'static str {
    "remote"
  }
}
