//! Environment-driven configuration
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present.

use std::env;
use std::time::Duration;

use crate::error::CoachError;
use crate::volume::LoadPolicy;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://coach-progress.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_HISTORY_CACHE_TTL_SECS: u64 = 60;

pub const DATABASE_URL_VAR: &str = "COACH_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "COACH_DB_MAX_CONNECTIONS";
pub const LOAD_POLICY_VAR: &str = "COACH_LOAD_POLICY";
pub const HISTORY_CACHE_TTL_VAR: &str = "COACH_HISTORY_CACHE_TTL_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub database_url: String,
  pub max_connections: u32,
  pub load_policy: LoadPolicy,
  /// Zero disables the history cache
  pub history_cache_ttl: Duration,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      load_policy: LoadPolicy::default(),
      history_cache_ttl: Duration::from_secs(DEFAULT_HISTORY_CACHE_TTL_SECS),
    }
  }
}

impl AppConfig {
  /// Load `.env` (if any) and read the environment
  pub fn load() -> Result<Self, CoachError> {
    dotenvy::dotenv().ok();
    Self::from_env()
  }

  /// Read configuration from the current environment only
  pub fn from_env() -> Result<Self, CoachError> {
    let defaults = Self::default();

    let max_connections = match optional_var(MAX_CONNECTIONS_VAR) {
      Some(raw) => match raw.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
          return Err(CoachError::Config(format!(
            "{} must be a positive integer, got {:?}",
            MAX_CONNECTIONS_VAR, raw
          )))
        }
      },
      None => defaults.max_connections,
    };

    let load_policy = match optional_var(LOAD_POLICY_VAR) {
      Some(raw) => raw
        .parse::<LoadPolicy>()
        .map_err(|e| CoachError::Config(format!("{}: {}", LOAD_POLICY_VAR, e)))?,
      None => defaults.load_policy,
    };

    let history_cache_ttl = match optional_var(HISTORY_CACHE_TTL_VAR) {
      Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
        CoachError::Config(format!(
          "{} must be a number of seconds, got {:?}",
          HISTORY_CACHE_TTL_VAR, raw
        ))
      })?,
      None => defaults.history_cache_ttl,
    };

    Ok(Self {
      database_url: optional_var(DATABASE_URL_VAR).unwrap_or(defaults.database_url),
      max_connections,
      load_policy,
      history_cache_ttl,
    })
  }

  pub fn history_cache_enabled(&self) -> bool {
    !self.history_cache_ttl.is_zero()
  }
}

/// Unset and blank are treated the same
fn optional_var(name: &str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}
