use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CoachError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

impl From<sqlx::Error> for CoachError {
  fn from(e: sqlx::Error) -> Self {
    CoachError::Database(e.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for CoachError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    CoachError::Database(format!("Migration failed: {}", e))
  }
}

impl From<serde_json::Error> for CoachError {
  fn from(e: serde_json::Error) -> Self {
    CoachError::Serialization(e.to_string())
  }
}

/// Errors surfaced by a volume storage backend
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
  #[error("Storage backend error: {0}")]
  Backend(String),

  #[error("Corrupt volume record: {0}")]
  Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
  fn from(e: sqlx::Error) -> Self {
    StoreError::Backend(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_serializes_with_type_tag() {
    let err = CoachError::NotFound("assignment for client c-1".to_string());
    let json = serde_json::to_string(&err).unwrap();
    assert_eq!(json, r#"{"type":"NotFound","message":"assignment for client c-1"}"#);
  }

  #[test]
  fn test_error_display_messages() {
    assert_eq!(
      CoachError::Config("COACH_LOAD_POLICY".into()).to_string(),
      "Invalid configuration: COACH_LOAD_POLICY"
    );
    assert_eq!(
      StoreError::Backend("disk full".into()).to_string(),
      "Storage backend error: disk full"
    );
  }

  #[test]
  fn test_serde_json_error_converts() {
    let parse_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
    let err: CoachError = parse_err.into();
    assert!(matches!(err, CoachError::Serialization(_)));
  }
}
