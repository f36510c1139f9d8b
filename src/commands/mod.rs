pub mod progression;
pub mod volume;

use crate::db::AppState;
use crate::progression::{load_assignment, WorkoutAssignment};

/// Full assignment (program + weeks) for a client
pub async fn get_client_assignment(
  state: &AppState,
  client_id: String,
) -> Result<WorkoutAssignment, String> {
  load_assignment(&state.db, &client_id)
    .await
    .map_err(|e| e.to_string())
}
