use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A client's workout program: days, each holding exercises, each holding sets.
///
/// Every field tolerates absence or `null` so that partially filled programs
/// coming from the editor deserialize instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutProgram {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub days: Vec<ProgramDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDay {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default)]
  pub muscle_group: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub sets: Vec<ExerciseSet>,
}

impl Exercise {
  /// Muscle group used as the volume bucket key (None if missing or blank)
  pub fn muscle_group_key(&self) -> Option<&str> {
    self
      .muscle_group
      .as_deref()
      .map(str::trim)
      .filter(|g| !g.is_empty())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
  #[serde(default, deserialize_with = "null_as_default")]
  pub reps: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub weight: f64,
}

impl WorkoutProgram {
  /// Iterate every exercise across all days
  pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
    self.days.iter().flat_map(|d| d.exercises.iter())
  }
}
