//! Commands for the week progression engine

use crate::db::AppState;
use crate::models::{Week, WeekStatus, WorkoutProgram};
use crate::progression::{
    can_access_week, complete_week, create_assignment, load_assignment, week_status,
    WeekCompletion, WeekProgressionSummary, WorkoutAssignment,
};

/// Assign a program to a client and record week 1's volume
pub async fn create_client_assignment(
    state: &AppState,
    client_id: String,
    program: WorkoutProgram,
    total_weeks: u32,
) -> Result<WorkoutAssignment, String> {
    let assignment = create_assignment(&state.db, &client_id, &program, total_weeks)
        .await
        .map_err(|e| e.to_string())?;

    state
        .volumes
        .calculate_and_save_weekly_volume(&client_id, 1, &assignment.program)
        .await;

    Ok(assignment)
}

/// Get a client's week sequence
pub async fn get_client_weeks(state: &AppState, client_id: String) -> Result<Vec<Week>, String> {
    Ok(load_assignment(&state.db, &client_id)
        .await
        .map_err(|e| e.to_string())?
        .weeks)
}

/// Completed / remaining weeks and the current week
pub async fn get_client_progression(
    state: &AppState,
    client_id: String,
) -> Result<WeekProgressionSummary, String> {
    let assignment = load_assignment(&state.db, &client_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(assignment.summary())
}

/// Status of a single week
pub async fn get_client_week_status(
    state: &AppState,
    client_id: String,
    week_number: u32,
) -> Result<WeekStatus, String> {
    let assignment = load_assignment(&state.db, &client_id)
        .await
        .map_err(|e| e.to_string())?;

    assignment
        .weeks
        .iter()
        .find(|w| w.week_number == week_number)
        .map(week_status)
        .ok_or_else(|| format!("Week {} not found", week_number))
}

/// Whether the client may open a week
pub async fn check_week_access(
    state: &AppState,
    client_id: String,
    week_number: u32,
) -> Result<bool, String> {
    let assignment = load_assignment(&state.db, &client_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(can_access_week(&assignment.weeks, week_number))
}

/// Mark a week complete; a newly unlocked week starts from the previous week's volume
pub async fn complete_client_week(
    state: &AppState,
    client_id: String,
    week_number: u32,
) -> Result<WeekCompletion, String> {
    let completion = complete_week(&state.db, &client_id, week_number)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(unlocked) = completion.unlocked_week {
        state
            .volumes
            .copy_previous_week_volume(&client_id, unlocked)
            .await;
    }

    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_program, setup_test_state};
    use crate::volume::VolumeStore;

    #[tokio::test]
    async fn test_assignment_lifecycle() {
        let state = setup_test_state().await;
        let client = "client-1".to_string();

        let assignment = create_client_assignment(&state, client.clone(), mock_program(), 4)
            .await
            .expect("Should create");
        assert_eq!(assignment.weeks.len(), 4);

        let summary = get_client_progression(&state, client.clone()).await.unwrap();
        assert_eq!(summary.current_week, 1);
        assert_eq!(summary.progress_percentage, 0);

        assert_eq!(
            get_client_week_status(&state, client.clone(), 1).await.unwrap(),
            WeekStatus::Active
        );
        assert!(!check_week_access(&state, client.clone(), 2).await.unwrap());

        let completion = complete_client_week(&state, client.clone(), 1).await.unwrap();
        assert!(completion.success);
        assert_eq!(completion.current_week, 2);

        assert!(check_week_access(&state, client.clone(), 2).await.unwrap());
        assert_eq!(
            get_client_week_status(&state, client.clone(), 1).await.unwrap(),
            WeekStatus::Completed
        );

        let weeks = get_client_weeks(&state, client.clone()).await.unwrap();
        assert!(weeks[1].is_unlocked);
        assert!(!weeks[2].is_unlocked);

        state.db.close().await;
    }

    #[tokio::test]
    async fn test_completion_copies_volume_forward() {
        let state = setup_test_state().await;
        let client = "client-1".to_string();
        create_client_assignment(&state, client.clone(), mock_program(), 3)
            .await
            .unwrap();

        let week1 = state.volumes.store().get_weekly_volume(&client, 1).await.unwrap();
        assert_eq!(week1.len(), 3);

        complete_client_week(&state, client.clone(), 1).await.unwrap();

        let week2 = state.volumes.store().get_weekly_volume(&client, 2).await.unwrap();
        assert_eq!(week2, week1);

        state.db.close().await;
    }

    #[tokio::test]
    async fn test_rejected_completion_is_not_an_error() {
        let state = setup_test_state().await;
        let client = "client-1".to_string();
        create_client_assignment(&state, client.clone(), mock_program(), 3)
            .await
            .unwrap();

        let result = complete_client_week(&state, client.clone(), 3).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not unlocked yet"));

        let missing_week = get_client_week_status(&state, client.clone(), 9).await;
        assert_eq!(missing_week.unwrap_err(), "Week 9 not found");

        let week3 = state.volumes.store().get_weekly_volume(&client, 3).await.unwrap();
        assert!(week3.is_empty());

        state.db.close().await;
    }

    #[tokio::test]
    async fn test_unknown_client_is_an_error() {
        let state = setup_test_state().await;

        let err = complete_client_week(&state, "ghost".to_string(), 1)
            .await
            .unwrap_err();
        assert!(err.contains("ghost"));

        state.db.close().await;
    }
}
