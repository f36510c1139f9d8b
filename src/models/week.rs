use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{null_as_default, Exercise, ProgramDay};

/// One period of a client's assigned program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
  pub week_number: u32,
  #[serde(default)]
  pub is_unlocked: bool,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(default)]
  pub start_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub days: Vec<ProgramDay>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub exercises: Vec<Exercise>,
}

impl Week {
  /// A locked, not yet started week
  pub fn locked(week_number: u32) -> Self {
    Self {
      week_number,
      is_unlocked: false,
      is_completed: false,
      start_date: None,
      completed_at: None,
      days: Vec::new(),
      exercises: Vec::new(),
    }
  }

  /// Unlocked and not yet completed
  pub fn is_active(&self) -> bool {
    self.is_unlocked && !self.is_completed
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
  Locked,
  Active,
  Completed,
}

impl std::fmt::Display for WeekStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Locked => write!(f, "locked"),
      Self::Active => write!(f, "active"),
      Self::Completed => write!(f, "completed"),
    }
  }
}

impl std::str::FromStr for WeekStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "locked" => Ok(Self::Locked),
      "active" => Ok(Self::Active),
      "completed" => Ok(Self::Completed),
      _ => Err(format!("Unknown week status: {}", s)),
    }
  }
}
