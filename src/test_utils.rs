//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock program factories
//! - An in-memory volume store with injectable failures

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::AppConfig;
use crate::db::AppState;
use crate::error::StoreError;
use crate::models::{
  Exercise, ExerciseSet, MuscleGroupVolume, ProgramDay, VolumeRecord, WorkoutProgram,
};
use crate::volume::VolumeStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// App state over a fresh test database with default config
pub async fn setup_test_state() -> AppState {
  let pool = setup_test_db().await;
  AppState::new(pool, AppConfig::default())
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_exercise(name: &str, muscle_group: &str, sets: &[(u32, f64)]) -> Exercise {
  Exercise {
    name: name.to_string(),
    muscle_group: Some(muscle_group.to_string()),
    sets: sets
      .iter()
      .map(|&(reps, weight)| ExerciseSet { reps, weight })
      .collect(),
  }
}

/// Push / pull / legs split
///
/// chest = 3x10x60 + 3x12x20 = 2520, back = 3x10x50 = 1500, legs = 5x5x100 = 2500
pub fn mock_program_days() -> Vec<ProgramDay> {
  vec![
    ProgramDay {
      name: "Push".to_string(),
      exercises: vec![
        mock_exercise("Bench Press", "chest", &[(10, 60.0), (10, 60.0), (10, 60.0)]),
        mock_exercise("Incline Fly", "chest", &[(12, 20.0), (12, 20.0), (12, 20.0)]),
      ],
    },
    ProgramDay {
      name: "Pull".to_string(),
      exercises: vec![mock_exercise(
        "Barbell Row",
        "back",
        &[(10, 50.0), (10, 50.0), (10, 50.0)],
      )],
    },
    ProgramDay {
      name: "Legs".to_string(),
      exercises: vec![mock_exercise(
        "Back Squat",
        "legs",
        &[(5, 100.0), (5, 100.0), (5, 100.0), (5, 100.0), (5, 100.0)],
      )],
    },
  ]
}

pub fn mock_program() -> WorkoutProgram {
  WorkoutProgram {
    name: "PPL Block".to_string(),
    days: mock_program_days(),
  }
}

/// ---------------------------------------------------------------------------
/// In-Memory Volume Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryVolumeStore {
  records: Mutex<Vec<VolumeRecord>>,
  fail_groups: HashSet<String>,
  fail_reads: bool,
  history_reads: AtomicUsize,
}

impl InMemoryVolumeStore {
  /// Writes for this muscle group fail
  pub fn failing_on(mut self, muscle_group: &str) -> Self {
    self.fail_groups.insert(muscle_group.to_string());
    self
  }

  /// Every read fails
  pub fn failing_reads(mut self) -> Self {
    self.fail_reads = true;
    self
  }

  /// Number of history reads that reached this store
  pub fn history_reads(&self) -> usize {
    self.history_reads.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl VolumeStore for InMemoryVolumeStore {
  async fn save_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
    muscle_group: &str,
    volume: f64,
  ) -> Result<(), StoreError> {
    if self.fail_groups.contains(muscle_group) {
      return Err(StoreError::Backend(format!("write rejected for {}", muscle_group)));
    }

    let mut records = self.records.lock().unwrap();
    let existing = records.iter_mut().find(|r| {
      r.client_id == client_id && r.week_number == week_number && r.muscle_group == muscle_group
    });
    match existing {
      Some(record) => {
        record.volume = volume;
        record.updated_at = Utc::now();
      }
      None => records.push(VolumeRecord {
        client_id: client_id.to_string(),
        week_number,
        muscle_group: muscle_group.to_string(),
        volume,
        updated_at: Utc::now(),
      }),
    }
    Ok(())
  }

  async fn get_volume_history(&self, client_id: &str) -> Result<Vec<VolumeRecord>, StoreError> {
    self.history_reads.fetch_add(1, Ordering::SeqCst);
    if self.fail_reads {
      return Err(StoreError::Backend("history unavailable".to_string()));
    }

    let mut history: Vec<VolumeRecord> = self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.client_id == client_id)
      .cloned()
      .collect();
    history.sort_by(|a, b| {
      (a.week_number, &a.muscle_group).cmp(&(b.week_number, &b.muscle_group))
    });
    Ok(history)
  }

  async fn get_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
  ) -> Result<Vec<MuscleGroupVolume>, StoreError> {
    if self.fail_reads {
      return Err(StoreError::Backend("week unavailable".to_string()));
    }

    let mut rows: Vec<MuscleGroupVolume> = self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.client_id == client_id && r.week_number == week_number)
      .map(|r| MuscleGroupVolume {
        muscle_group: r.muscle_group.clone(),
        volume: r.volume,
      })
      .collect();
    rows.sort_by(|a, b| a.muscle_group.cmp(&b.muscle_group));
    Ok(rows)
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workout_assignments', 'weekly_volumes')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_program_shape() {
    let program = mock_program();
    assert_eq!(program.days.len(), 3);
    assert_eq!(program.exercises().count(), 4);
  }

  #[tokio::test]
  async fn test_in_memory_store_upserts() {
    let store = InMemoryVolumeStore::default();
    store.save_weekly_volume("c", 1, "chest", 10.0).await.unwrap();
    store.save_weekly_volume("c", 1, "chest", 20.0).await.unwrap();

    let rows = store.get_weekly_volume("c", 1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].volume, 20.0);
  }
}
