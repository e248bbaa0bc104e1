use thiserror::Error;

#[derive(Error, Debug)]
pub enum MorpheusError {
  #[error("Storage error for key '{key}': {message}")]
  Storage { key: String, message: String },

  #[error("Failed to (de)serialize {what}: {source}")]
  Serialization {
    what: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid backup file: {0}")]
  InvalidBackup(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Remote request failed: {0}")]
  Remote(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl MorpheusError {
  pub fn storage(key: &str, message: impl std::fmt::Display) -> Self {
    MorpheusError::Storage { key: key.to_string(), message: message.to_string() }
  }

  pub fn serialization(what: &str, source: serde_json::Error) -> Self {
    MorpheusError::Serialization { what: what.to_string(), source }
  }
}

impl From<reqwest::Error> for MorpheusError {
  fn from(e: reqwest::Error) -> Self {
    MorpheusError::Remote(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, MorpheusError>;
