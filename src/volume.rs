//! Training volume aggregation
//!
//! Turns a workout program into per-muscle-group load (`reps * weight`) for a
//! week, and keeps a per-client history of those snapshots for charting.
//! Persistence goes through the `VolumeStore` trait; writes for one snapshot
//! are independent, so a failed muscle group never blocks its siblings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{
  ChartRow, ExerciseSet, MuscleGroupVolume, VolumeRecord, VolumeSnapshot, WorkoutProgram,
};

/// ---------------------------------------------------------------------------
/// Load Policy
/// ---------------------------------------------------------------------------

/// How a single set turns into load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
  /// `reps * weight`; zero weight contributes zero
  #[default]
  Raw,
  /// `reps * max(weight, 1)` so bodyweight sets still register
  BodyweightFloor,
}

impl LoadPolicy {
  pub fn set_load(&self, set: &ExerciseSet) -> f64 {
    let weight = match self {
      LoadPolicy::Raw => set.weight,
      LoadPolicy::BodyweightFloor => set.weight.max(1.0),
    };
    f64::from(set.reps) * weight
  }
}

impl std::fmt::Display for LoadPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Raw => write!(f, "raw"),
      Self::BodyweightFloor => write!(f, "bodyweight_floor"),
    }
  }
}

impl std::str::FromStr for LoadPolicy {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "raw" => Ok(Self::Raw),
      "bodyweight_floor" => Ok(Self::BodyweightFloor),
      _ => Err(format!("Unknown load policy: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Pure Aggregation
/// ---------------------------------------------------------------------------

/// Sum `reps * weight` per muscle group across every day, exercise and set
pub fn calculate_weekly_volume(program: &WorkoutProgram) -> VolumeSnapshot {
  calculate_weekly_volume_with(program, LoadPolicy::Raw)
}

/// Same as `calculate_weekly_volume` with an explicit load policy.
///
/// Exercises without a muscle group or without sets contribute nothing.
pub fn calculate_weekly_volume_with(program: &WorkoutProgram, policy: LoadPolicy) -> VolumeSnapshot {
  let mut volume = VolumeSnapshot::new();

  for exercise in program.exercises() {
    let Some(group) = exercise.muscle_group_key() else {
      continue;
    };
    if exercise.sets.is_empty() {
      continue;
    }

    let load: f64 = exercise.sets.iter().map(|s| policy.set_load(s)).sum();
    *volume.entry(group.to_string()).or_insert(0.0) += load;
  }

  volume
}

/// Distinct muscle groups in the program, sorted
pub fn muscle_groups_from_program(program: &WorkoutProgram) -> Vec<String> {
  program
    .exercises()
    .filter_map(|e| e.muscle_group_key())
    .map(str::to_string)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Fold history rows into per-week snapshots; the latest `updated_at` wins
pub fn snapshots_by_week(records: &[VolumeRecord]) -> BTreeMap<u32, VolumeSnapshot> {
  let mut ordered: Vec<&VolumeRecord> = records.iter().collect();
  ordered.sort_by_key(|r| r.updated_at);

  let mut weeks: BTreeMap<u32, VolumeSnapshot> = BTreeMap::new();
  for record in ordered {
    weeks
      .entry(record.week_number)
      .or_default()
      .insert(record.muscle_group.clone(), record.volume);
  }
  weeks
}

/// ---------------------------------------------------------------------------
/// Storage Collaborator
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait VolumeStore: Send + Sync {
  /// Upsert one (client, week, muscle group) cell
  async fn save_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
    muscle_group: &str,
    volume: f64,
  ) -> Result<(), StoreError>;

  /// Every stored cell for a client
  async fn get_volume_history(&self, client_id: &str) -> Result<Vec<VolumeRecord>, StoreError>;

  /// Stored cells for one week
  async fn get_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
  ) -> Result<Vec<MuscleGroupVolume>, StoreError>;
}

#[async_trait]
impl<T: VolumeStore + ?Sized> VolumeStore for Arc<T> {
  async fn save_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
    muscle_group: &str,
    volume: f64,
  ) -> Result<(), StoreError> {
    (**self)
      .save_weekly_volume(client_id, week_number, muscle_group, volume)
      .await
  }

  async fn get_volume_history(&self, client_id: &str) -> Result<Vec<VolumeRecord>, StoreError> {
    (**self).get_volume_history(client_id).await
  }

  async fn get_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
  ) -> Result<Vec<MuscleGroupVolume>, StoreError> {
    (**self).get_weekly_volume(client_id, week_number).await
  }
}

/// SQLite-backed volume store
#[derive(Debug, Clone)]
pub struct SqliteVolumeStore {
  pool: SqlitePool,
}

impl SqliteVolumeStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

fn week_from_row(value: i64) -> Result<u32, StoreError> {
  u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("week_number {}", value)))
}

#[async_trait]
impl VolumeStore for SqliteVolumeStore {
  async fn save_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
    muscle_group: &str,
    volume: f64,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO weekly_volumes (client_id, week_number, muscle_group, volume, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(client_id, week_number, muscle_group) DO UPDATE SET
        volume = excluded.volume,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(client_id)
    .bind(i64::from(week_number))
    .bind(muscle_group)
    .bind(volume)
    .bind(Utc::now().to_rfc3339())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_volume_history(&self, client_id: &str) -> Result<Vec<VolumeRecord>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT client_id, week_number, muscle_group, volume, updated_at
      FROM weekly_volumes
      WHERE client_id = ?
      ORDER BY week_number, muscle_group
      "#,
    )
    .bind(client_id)
    .fetch_all(&self.pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
      let updated_at: String = row.get("updated_at");
      let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("updated_at {}: {}", updated_at, e)))?;

      records.push(VolumeRecord {
        client_id: row.get("client_id"),
        week_number: week_from_row(row.get("week_number"))?,
        muscle_group: row.get("muscle_group"),
        volume: row.get("volume"),
        updated_at,
      });
    }

    Ok(records)
  }

  async fn get_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
  ) -> Result<Vec<MuscleGroupVolume>, StoreError> {
    let rows: Vec<(String, f64)> = sqlx::query_as(
      r#"
      SELECT muscle_group, volume
      FROM weekly_volumes
      WHERE client_id = ? AND week_number = ?
      ORDER BY muscle_group
      "#,
    )
    .bind(client_id)
    .bind(i64::from(week_number))
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(muscle_group, volume)| MuscleGroupVolume { muscle_group, volume })
        .collect(),
    )
  }
}

/// ---------------------------------------------------------------------------
/// Weekly Volume Manager: aggregation composed with storage
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WeeklyVolumeManager<S> {
  store: S,
  policy: LoadPolicy,
}

impl<S: VolumeStore> WeeklyVolumeManager<S> {
  pub fn new(store: S) -> Self {
    Self::with_policy(store, LoadPolicy::default())
  }

  pub fn with_policy(store: S, policy: LoadPolicy) -> Self {
    Self { store, policy }
  }

  pub fn policy(&self) -> LoadPolicy {
    self.policy
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Write every cell of a snapshot concurrently; returns the failed muscle groups
  async fn save_snapshot(
    &self,
    client_id: &str,
    week_number: u32,
    snapshot: &VolumeSnapshot,
  ) -> Vec<String> {
    let writes = snapshot.iter().map(|(group, volume)| async move {
      let result = self
        .store
        .save_weekly_volume(client_id, week_number, group, *volume)
        .await;
      (group, result)
    });

    let mut failed = Vec::new();
    for (group, result) in join_all(writes).await {
      if let Err(e) = result {
        tracing::warn!(
          client_id,
          week_number,
          muscle_group = %group,
          error = %e,
          "Failed to save weekly volume"
        );
        failed.push(group.clone());
      }
    }
    failed
  }

  async fn read_week(&self, client_id: &str, week_number: u32) -> Vec<MuscleGroupVolume> {
    match self.store.get_weekly_volume(client_id, week_number).await {
      Ok(rows) => rows,
      Err(e) => {
        tracing::warn!(client_id, week_number, error = %e, "Failed to read weekly volume");
        Vec::new()
      }
    }
  }

  /// Compute a week's volume from the program and persist each muscle group
  pub async fn calculate_and_save_weekly_volume(
    &self,
    client_id: &str,
    week_number: u32,
    program: &WorkoutProgram,
  ) -> VolumeSnapshot {
    let snapshot = calculate_weekly_volume_with(program, self.policy);
    let failed = self.save_snapshot(client_id, week_number, &snapshot).await;

    tracing::debug!(
      client_id,
      week_number,
      muscle_groups = snapshot.len(),
      failed = failed.len(),
      "Saved weekly volume"
    );
    snapshot
  }

  /// Recompute the current week after a program edit.
  ///
  /// Replaces the stored snapshot: muscle groups stored for the week but no
  /// longer in the program are written back as 0.
  pub async fn recalculate_current_week_volume(
    &self,
    client_id: &str,
    current_week: u32,
    program: &WorkoutProgram,
  ) -> VolumeSnapshot {
    let snapshot = calculate_weekly_volume_with(program, self.policy);

    let mut writes = snapshot.clone();
    for stale in self.read_week(client_id, current_week).await {
      writes.entry(stale.muscle_group).or_insert(0.0);
    }

    let failed = self.save_snapshot(client_id, current_week, &writes).await;
    tracing::debug!(
      client_id,
      current_week,
      muscle_groups = snapshot.len(),
      cleared = writes.len() - snapshot.len(),
      failed = failed.len(),
      "Recalculated weekly volume"
    );
    snapshot
  }

  /// Seed a freshly unlocked week with the previous week's stored volume.
  ///
  /// No-op for week 1 or when the previous week has nothing stored.
  pub async fn copy_previous_week_volume(&self, client_id: &str, current_week: u32) -> VolumeSnapshot {
    if current_week <= 1 {
      return VolumeSnapshot::new();
    }

    let previous_week = current_week - 1;
    let previous = self.read_week(client_id, previous_week).await;
    if previous.is_empty() {
      tracing::debug!(client_id, previous_week, "No volume to copy forward");
      return VolumeSnapshot::new();
    }

    let snapshot: VolumeSnapshot = previous
      .into_iter()
      .map(|r| (r.muscle_group, r.volume))
      .collect();
    self.save_snapshot(client_id, current_week, &snapshot).await;

    snapshot
  }

  /// Stored history grouped per week
  pub async fn volume_history_by_week(&self, client_id: &str) -> BTreeMap<u32, VolumeSnapshot> {
    match self.store.get_volume_history(client_id).await {
      Ok(records) => snapshots_by_week(&records),
      Err(e) => {
        tracing::warn!(client_id, error = %e, "Failed to load volume history");
        BTreeMap::new()
      }
    }
  }

  /// One row per week 1..=max_weeks with every requested muscle group present
  pub async fn generate_chart_data(
    &self,
    client_id: &str,
    max_weeks: u32,
    all_muscle_groups: &[String],
  ) -> Vec<ChartRow> {
    let history = self.volume_history_by_week(client_id).await;

    (1..=max_weeks)
      .map(|week| {
        let recorded = history.get(&week);
        let volumes = all_muscle_groups
          .iter()
          .map(|group| {
            let volume = recorded.and_then(|s| s.get(group)).copied().unwrap_or(0.0);
            (group.clone(), volume)
          })
          .collect();
        ChartRow { week, volumes }
      })
      .collect()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
