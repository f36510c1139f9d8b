//! Commands for training volume tracking

use crate::db::AppState;
use crate::models::{ChartRow, MuscleGroupVolume, VolumeSnapshot, WorkoutProgram};
use crate::progression::{load_assignment, save_assignment_program};
use crate::volume::{muscle_groups_from_program, VolumeStore};

/// Store an edited program and recalculate the current week's volume
pub async fn update_client_program(
  state: &AppState,
  client_id: String,
  program: WorkoutProgram,
) -> Result<VolumeSnapshot, String> {
  save_assignment_program(&state.db, &client_id, &program)
    .await
    .map_err(|e| e.to_string())?;

  let assignment = load_assignment(&state.db, &client_id)
    .await
    .map_err(|e| e.to_string())?;

  Ok(
    state
      .volumes
      .recalculate_current_week_volume(&client_id, assignment.current_week(), &program)
      .await,
  )
}

/// Stored volume for one week
pub async fn get_client_volume(
  state: &AppState,
  client_id: String,
  week_number: u32,
) -> Result<Vec<MuscleGroupVolume>, String> {
  state
    .volumes
    .store()
    .get_weekly_volume(&client_id, week_number)
    .await
    .map_err(|e| format!("Failed to fetch weekly volume: {}", e))
}

/// Chart rows for every week of the assignment (or `max_weeks` when given)
pub async fn get_volume_chart(
  state: &AppState,
  client_id: String,
  max_weeks: Option<u32>,
) -> Result<Vec<ChartRow>, String> {
  let assignment = load_assignment(&state.db, &client_id)
    .await
    .map_err(|e| e.to_string())?;

  let muscle_groups = muscle_groups_from_program(&assignment.program);
  let max_weeks = max_weeks.unwrap_or(assignment.total_weeks);

  Ok(
    state
      .volumes
      .generate_chart_data(&client_id, max_weeks, &muscle_groups)
      .await,
  )
}

/// Muscle groups used to seed chart series
pub fn get_program_muscle_groups(program: &WorkoutProgram) -> Vec<String> {
  muscle_groups_from_program(program)
}
