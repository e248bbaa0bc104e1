//! Chat-completion client for OpenAI-compatible endpoints

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::{MorpheusError, Result};

/// One system + user exchange
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
  pub system: String,
  pub user: String,
  pub temperature: f64,
  pub max_tokens: u32,
}

/// Seam between the remote engines and the network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
  /// Text of the first choice; transport, status and decode failures are errors
  async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  temperature: f64,
  max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
  message: String,
}

/// `POST {base_url}/chat/completions` with a bearer token from the environment
pub struct OpenAiCompletionClient {
  client: Client,
  base_url: String,
  model: String,
  api_key: Option<String>,
}

impl OpenAiCompletionClient {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| MorpheusError::Remote(format!("failed to create HTTP client: {e}")))?;

    let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.trim().is_empty());
    if api_key.is_none() {
      tracing::debug!(var = %config.api_key_env, "no API key in environment");
    }

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      model: config.model.clone(),
      api_key,
    })
  }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.base_url)
  }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
  async fn complete(&self, request: &CompletionRequest) -> Result<String> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or_else(|| MorpheusError::Remote("no API key configured".to_string()))?;

    let body = ChatRequest {
      model: &self.model,
      messages: vec![
        ChatMessage { role: "system", content: &request.system },
        ChatMessage { role: "user", content: &request.user },
      ],
      temperature: request.temperature,
      max_tokens: request.max_tokens,
    };

    let response = self.client.post(self.url()).bearer_auth(api_key).json(&body).send().await?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| text.clone());
      return Err(MorpheusError::Remote(format!("HTTP {status}: {message}")));
    }

    let parsed: ChatResponse = response.json().await?;
    Ok(
      parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_request_body_shape() {
    let body = ChatRequest {
      model: "gpt-3.5-turbo",
      messages: vec![
        ChatMessage { role: "system", content: "sys" },
        ChatMessage { role: "user", content: "hi" },
      ],
      temperature: 0.7,
      max_tokens: 1000,
    };

    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["model"], "gpt-3.5-turbo");
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "hi");
    assert_eq!(json["max_tokens"], 1000);
  }

  #[test]
  fn test_response_first_choice() {
    let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"답변"}}]}"#;
    let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.choices[0].message.content.as_deref(), Some("답변"));
  }

  #[test]
  fn test_url_strips_trailing_slash() {
    let config = RemoteConfig { base_url: "http://localhost:8080/v1/".to_string(), ..Default::default() };
    let client = OpenAiCompletionClient::new(&config).unwrap();
    assert_eq!(client.url(), "http://localhost:8080/v1/chat/completions");
  }
}
