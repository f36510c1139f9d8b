use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Muscle group -> accumulated load for one (client, week)
pub type VolumeSnapshot = BTreeMap<String, f64>;

/// One persisted volume cell, the row shape exchanged with storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
  pub client_id: String,
  pub week_number: u32,
  pub muscle_group: String,
  pub volume: f64,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleGroupVolume {
  pub muscle_group: String,
  pub volume: f64,
}

/// One chart row: `{"week": 1, "chest": 980.0, "back": 0.0}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
  pub week: u32,
  #[serde(flatten)]
  pub volumes: BTreeMap<String, f64>,
}
