pub mod program;
pub mod volume;
pub mod week;

pub use program::{Exercise, ExerciseSet, ProgramDay, WorkoutProgram};
pub use volume::{ChartRow, MuscleGroupVolume, VolumeRecord, VolumeSnapshot};
pub use week::{Week, WeekStatus};

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` the same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
