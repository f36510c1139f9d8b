use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::CoachError;
use crate::volume::{SqliteVolumeStore, VolumeStore, WeeklyVolumeManager};
use crate::volume_cache::CachedVolumeStore;

pub type DbPool = SqlitePool;

/// Application state shared by every command
pub struct AppState {
  pub db: DbPool,
  pub config: AppConfig,
  pub volumes: WeeklyVolumeManager<Arc<dyn VolumeStore>>,
}

impl AppState {
  /// Wire the volume manager over the pool, with the history cache when enabled
  pub fn new(db: DbPool, config: AppConfig) -> Self {
    let sqlite = SqliteVolumeStore::new(db.clone());
    let store: Arc<dyn VolumeStore> = if config.history_cache_enabled() {
      Arc::new(CachedVolumeStore::new(sqlite, config.history_cache_ttl))
    } else {
      Arc::new(sqlite)
    };

    Self {
      db,
      volumes: WeeklyVolumeManager::with_policy(store, config.load_policy),
      config,
    }
  }
}

/// Initialize the database connection pool and run migrations
///
/// Note: `sqlite::memory:` gives every pooled connection its own database,
/// so in-memory URLs need `max_connections = 1`.
pub async fn initialize_db(config: &AppConfig) -> Result<DbPool, CoachError> {
  tracing::info!(url = %config.database_url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}
