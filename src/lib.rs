pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod progression;
pub mod volume;
pub mod volume_cache;

#[cfg(test)]
mod test_utils;

pub use config::AppConfig;
pub use db::AppState;
pub use error::{CoachError, StoreError};

use std::sync::Arc;

/// Install the global tracing subscriber (`RUST_LOG` overrides the `info` default)
pub fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

  // Already installed by the host is fine
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init();
}

/// Load configuration, open the database and build the shared state
pub async fn init() -> Result<Arc<AppState>, CoachError> {
  let config = AppConfig::load()?;
  let pool = db::initialize_db(&config).await?;

  tracing::info!(
    load_policy = %config.load_policy,
    history_cache = config.history_cache_enabled(),
    "Coach backend ready"
  );

  Ok(Arc::new(AppState::new(pool, config)))
}
