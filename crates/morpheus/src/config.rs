//! Configuration for the journal
//!
//! Loaded from `~/.morpheus/config.json` (or `--config` / `MORPHEUS_CONFIG`);
//! every field has a default so an absent file is a valid configuration.
//! `MORPHEUS_HOME`, `MORPHEUS_MODEL` and `MORPHEUS_BASE_URL` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MorpheusError, Result};

pub const HOME_ENV: &str = "MORPHEUS_HOME";
pub const CONFIG_ENV: &str = "MORPHEUS_CONFIG";
pub const MODEL_ENV: &str = "MORPHEUS_MODEL";
pub const BASE_URL_ENV: &str = "MORPHEUS_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Where the record slots and the event log live
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  /// Where exports are written; `<data_dir>/exports` when unset
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub export_dir: Option<PathBuf>,
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_model")]
  pub model: String,
  /// Name of the environment variable holding the bearer token
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_temperature")]
  pub temperature: f64,
  #[serde(default = "default_max_tokens")]
  pub max_tokens: u32,
  #[serde(default = "default_remote_timeout")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
  #[serde(default = "default_probe_url")]
  pub probe_url: String,
  #[serde(default = "default_probe_timeout")]
  pub timeout_secs: u64,
}

/// `$MORPHEUS_HOME`, else `~/.morpheus`
pub fn morpheus_home() -> PathBuf {
  if let Ok(home) = std::env::var(HOME_ENV) {
    if !home.trim().is_empty() {
      return PathBuf::from(home);
    }
  }
  dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".morpheus")
}

fn default_data_dir() -> PathBuf {
  morpheus_home()
}
fn default_base_url() -> String {
  "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
  "gpt-3.5-turbo".to_string()
}
fn default_api_key_env() -> String {
  "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f64 {
  0.7
}
fn default_max_tokens() -> u32 {
  1000
}
fn default_remote_timeout() -> u64 {
  30
}
fn default_probe_url() -> String {
  "https://www.google.com".to_string()
}
fn default_probe_timeout() -> u64 {
  5
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      model: default_model(),
      api_key_env: default_api_key_env(),
      temperature: default_temperature(),
      max_tokens: default_max_tokens(),
      timeout_secs: default_remote_timeout(),
    }
  }
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self { probe_url: default_probe_url(), timeout_secs: default_probe_timeout() }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      export_dir: None,
      remote: RemoteConfig::default(),
      connectivity: ConnectivityConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
      .map_err(|e| MorpheusError::Config(format!("{}: {}", path.display(), e)))
  }

  /// Resolve, load, apply environment overrides and validate.
  ///
  /// An explicitly named file must exist; the default location may be absent.
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    let from_env = std::env::var(CONFIG_ENV).ok().filter(|p| !p.trim().is_empty()).map(PathBuf::from);

    let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
      Some(path) => {
        if !path.exists() {
          return Err(MorpheusError::Config(format!("config file not found: {}", path.display())));
        }
        Self::load_from_file(&path)?
      }
      None => {
        let default_path = Self::default_path();
        if default_path.exists() {
          Self::load_from_file(&default_path)?
        } else {
          Self::default()
        }
      }
    };

    config.apply_env();
    config.validate()?;

    tracing::debug!(data_dir = %config.data_dir.display(), model = %config.remote.model, "config loaded");
    Ok(config)
  }

  pub fn default_path() -> PathBuf {
    morpheus_home().join("config.json")
  }

  /// Environment variables win over the file
  pub fn apply_env(&mut self) {
    if let Ok(home) = std::env::var(HOME_ENV) {
      if !home.trim().is_empty() {
        self.data_dir = PathBuf::from(home);
      }
    }
    if let Ok(model) = std::env::var(MODEL_ENV) {
      if !model.trim().is_empty() {
        self.remote.model = model;
      }
    }
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
      if !base_url.trim().is_empty() {
        self.remote.base_url = base_url;
      }
    }
  }

  pub fn validate(&self) -> Result<()> {
    if !(0.0..=2.0).contains(&self.remote.temperature) {
      return Err(MorpheusError::Config(format!(
        "remote.temperature must be within [0, 2], got {}",
        self.remote.temperature
      )));
    }
    if self.remote.max_tokens == 0 {
      return Err(MorpheusError::Config("remote.max_tokens must be positive".to_string()));
    }
    if self.remote.model.trim().is_empty() {
      return Err(MorpheusError::Config("remote.model must not be empty".to_string()));
    }

    for (field, value) in
      [("remote.base_url", &self.remote.base_url), ("connectivity.probe_url", &self.connectivity.probe_url)]
    {
      url::Url::parse(value)
        .map_err(|e| MorpheusError::Config(format!("{field} '{value}' is not a valid URL: {e}")))?;
    }

    Ok(())
  }

  pub fn export_dir(&self) -> PathBuf {
    self.export_dir.clone().unwrap_or_else(|| self.data_dir.join("exports"))
  }

  pub fn event_log_path(&self) -> PathBuf {
    self.data_dir.join("events.jsonl")
  }

  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(self)
      .map_err(|e| MorpheusError::serialization("config", e))?;
    std::fs::write(path, content)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::fs;
  use tempfile::TempDir;

  fn clear_env() {
    for var in [HOME_ENV, CONFIG_ENV, MODEL_ENV, BASE_URL_ENV] {
      std::env::remove_var(var);
    }
  }

  #[test]
  #[serial]
  fn test_defaults() {
    clear_env();
    let config = Config::default();

    assert_eq!(config.remote.model, "gpt-3.5-turbo");
    assert_eq!(config.remote.temperature, 0.7);
    assert_eq!(config.remote.max_tokens, 1000);
    assert_eq!(config.remote.timeout_secs, 30);
    assert_eq!(config.remote.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.connectivity.probe_url, "https://www.google.com");
    assert_eq!(config.connectivity.timeout_secs, 5);
    assert!(config.data_dir.ends_with(".morpheus"));
    assert_eq!(config.export_dir(), config.data_dir.join("exports"));
    assert!(config.validate().is_ok());
  }

  #[test]
  #[serial]
  fn test_partial_file_keeps_defaults() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{ "remote": { "model": "gpt-4o-mini", "timeout_secs": 10 } }"#).unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.remote.model, "gpt-4o-mini");
    assert_eq!(config.remote.timeout_secs, 10);
    assert_eq!(config.remote.max_tokens, 1000);
    assert_eq!(config.connectivity, ConnectivityConfig::default());
  }

  #[test]
  #[serial]
  fn test_env_overrides_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{ "remote": { "model": "from-file" } }"#).unwrap();

    std::env::set_var(CONFIG_ENV, &path);
    std::env::set_var(HOME_ENV, temp.path().join("home"));
    std::env::set_var(MODEL_ENV, "from-env");

    let config = Config::load(None).unwrap();
    assert_eq!(config.remote.model, "from-env");
    assert_eq!(config.data_dir, temp.path().join("home"));
    assert_eq!(config.event_log_path(), temp.path().join("home").join("events.jsonl"));

    clear_env();
  }

  #[test]
  #[serial]
  fn test_missing_default_file_uses_defaults() {
    clear_env();
    let temp = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, temp.path());

    let config = Config::load(None).unwrap();
    assert_eq!(config.data_dir, temp.path());
    assert_eq!(config.remote, RemoteConfig::default());

    clear_env();
  }

  #[test]
  #[serial]
  fn test_missing_explicit_file_is_an_error() {
    clear_env();
    let result = Config::load(Some(Path::new("/nonexistent/morpheus.json")));
    assert!(matches!(result, Err(MorpheusError::Config(_))));
  }

  #[test]
  fn test_validation_rejects_bad_values() {
    let mut config = Config::default();
    config.remote.temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.remote.max_tokens = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.connectivity.probe_url = "not a url".to_string();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_malformed_file_is_config_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from_file(&path), Err(MorpheusError::Config(_))));
  }

  #[test]
  fn test_save_and_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let mut config = Config::default();
    config.export_dir = Some(temp.path().join("out"));

    config.save_to_file(&path).unwrap();
    assert_eq!(Config::load_from_file(&path).unwrap(), config);
  }
}
