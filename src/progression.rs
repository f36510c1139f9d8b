//! Week Progression Engine
//!
//! One-way state machine over the weeks of a client's workout assignment:
//! - every week moves locked -> active -> completed, never backwards
//! - only `mark_week_complete` drives transitions
//! - completing week N unlocks week N+1 when it exists
//! - the current week is derived from the week flags on every read, never stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::error::CoachError;
use crate::models::{ProgramDay, Week, WeekStatus, WorkoutProgram};

// ---------------------------------------------------------------------------
/// Completion Failure: the closed set of rejected transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionFailure {
    #[error("Invalid week number: {week_number} (program has {total_weeks} weeks)")]
    InvalidWeekNumber { week_number: u32, total_weeks: u32 },
    #[error("Week {week_number} not found")]
    WeekNotFound { week_number: u32 },
    #[error("Week {week_number} is already completed")]
    AlreadyCompleted { week_number: u32 },
    #[error("Week {week_number} is not unlocked yet")]
    NotUnlocked { week_number: u32 },
}

// ---------------------------------------------------------------------------
/// Week Completion: result of a mark-complete request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekCompletion {
    pub success: bool,
    pub message: String,
    pub updated_weeks: Vec<Week>,
    pub current_week: u32,
    /// Set when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CompletionFailure>,
    /// Week unlocked by this completion, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_week: Option<u32>,
}

impl WeekCompletion {
    fn rejected(weeks: &[Week], failure: CompletionFailure) -> Self {
        Self {
            success: false,
            message: failure.to_string(),
            updated_weeks: weeks.to_vec(),
            current_week: current_week(weeks),
            failure: Some(failure),
            unlocked_week: None,
        }
    }
}

// ---------------------------------------------------------------------------
/// Progression Summary: read-only view over a week sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekProgressionSummary {
    pub completed_weeks: u32,
    pub total_weeks: u32,
    pub current_week: u32,
    pub progress_percentage: u32,
    pub is_finished: bool,
    pub weeks_remaining: u32,
}

fn as_week_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// The active week: lowest-numbered week that is unlocked and not completed.
///
/// With no active week, falls back to the week after the last completed one
/// (capped at the number of weeks), or 1 when nothing is completed.
pub fn current_week(weeks: &[Week]) -> u32 {
    if let Some(active) = weeks
        .iter()
        .filter(|w| w.is_active())
        .map(|w| w.week_number)
        .min()
    {
        return active;
    }

    let total = as_week_count(weeks.len());
    weeks
        .iter()
        .filter(|w| w.is_completed)
        .map(|w| w.week_number)
        .max()
        .map(|last| last.saturating_add(1).min(total))
        .unwrap_or(1)
}

pub fn week_status(week: &Week) -> WeekStatus {
    if week.is_completed {
        WeekStatus::Completed
    } else if week.is_unlocked {
        WeekStatus::Active
    } else {
        WeekStatus::Locked
    }
}

/// Unknown weeks are never accessible
pub fn can_access_week(weeks: &[Week], week_number: u32) -> bool {
    weeks
        .iter()
        .find(|w| w.week_number == week_number)
        .is_some_and(|w| w.is_unlocked)
}

pub fn mark_week_complete(weeks: &[Week], week_number: u32, total_weeks: u32) -> WeekCompletion {
    mark_week_complete_at(weeks, week_number, total_weeks, Utc::now())
}

/// Complete `week_number` and unlock the following week.
///
/// Preconditions are checked in order and the first failure is returned with
/// the input weeks unchanged. The input slice is never mutated.
pub fn mark_week_complete_at(
    weeks: &[Week],
    week_number: u32,
    total_weeks: u32,
    now: DateTime<Utc>,
) -> WeekCompletion {
    if week_number < 1 || week_number > total_weeks {
        return WeekCompletion::rejected(
            weeks,
            CompletionFailure::InvalidWeekNumber {
                week_number,
                total_weeks,
            },
        );
    }

    let Some(target) = weeks.iter().find(|w| w.week_number == week_number) else {
        return WeekCompletion::rejected(weeks, CompletionFailure::WeekNotFound { week_number });
    };

    if target.is_completed {
        return WeekCompletion::rejected(weeks, CompletionFailure::AlreadyCompleted { week_number });
    }
    if !target.is_unlocked {
        return WeekCompletion::rejected(weeks, CompletionFailure::NotUnlocked { week_number });
    }

    let next_number = week_number.checked_add(1).filter(|_| week_number < total_weeks);
    let mut unlocked_week = None;

    let updated_weeks: Vec<Week> = weeks
        .iter()
        .map(|w| {
            if w.week_number == week_number {
                Week {
                    is_completed: true,
                    completed_at: Some(now),
                    ..w.clone()
                }
            } else if next_number == Some(w.week_number) {
                unlocked_week = Some(w.week_number);
                Week {
                    is_unlocked: true,
                    start_date: Some(now),
                    ..w.clone()
                }
            } else {
                w.clone()
            }
        })
        .collect();

    let (current_week, message) = match (unlocked_week, next_number) {
        (Some(next), _) => (
            next,
            format!("Week {} completed! Week {} is now unlocked.", week_number, next),
        ),
        // Sequence shorter than total_weeks: nothing to unlock
        (None, Some(next)) => (
            current_week(&updated_weeks),
            format!(
                "Week {} completed! Week {} is missing from the program.",
                week_number, next
            ),
        ),
        (None, None) => (
            week_number,
            format!("Week {} completed! Program finished.", week_number),
        ),
    };

    WeekCompletion {
        success: true,
        message,
        updated_weeks,
        current_week,
        failure: None,
        unlocked_week,
    }
}

pub fn initialize_weeks(total_weeks: u32, program_days: &[ProgramDay]) -> Vec<Week> {
    initialize_weeks_at(total_weeks, program_days, Utc::now())
}

/// Build weeks 1..=total_weeks; only week 1 starts unlocked
pub fn initialize_weeks_at(
    total_weeks: u32,
    program_days: &[ProgramDay],
    now: DateTime<Utc>,
) -> Vec<Week> {
    (1..=total_weeks)
        .map(|week_number| {
            let first = week_number == 1;
            Week {
                is_unlocked: first,
                start_date: first.then_some(now),
                days: program_days.to_vec(),
                ..Week::locked(week_number)
            }
        })
        .collect()
}

pub fn progression_summary(weeks: &[Week]) -> WeekProgressionSummary {
    let total_weeks = as_week_count(weeks.len());
    let completed_weeks = as_week_count(weeks.iter().filter(|w| w.is_completed).count());
    let progress_percentage = if total_weeks > 0 {
        (completed_weeks as f64 / total_weeks as f64 * 100.0).round() as u32
    } else {
        0
    };

    WeekProgressionSummary {
        completed_weeks,
        total_weeks,
        current_week: current_week(weeks),
        progress_percentage,
        is_finished: completed_weeks == total_weeks,
        weeks_remaining: total_weeks.saturating_sub(completed_weeks),
    }
}

// ---------------------------------------------------------------------------
/// Workout Assignment: the entity that owns a client's week sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutAssignment {
    pub id: i64,
    pub client_id: String,
    pub total_weeks: u32,
    pub program: WorkoutProgram,
    pub weeks: Vec<Week>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutAssignment {
    pub fn current_week(&self) -> u32 {
        current_week(&self.weeks)
    }

    pub fn summary(&self) -> WeekProgressionSummary {
        progression_summary(&self.weeks)
    }
}

fn parse_timestamp(value: Option<String>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

// ---------------------------------------------------------------------------
// Database Operations
// ---------------------------------------------------------------------------

/// Create (or replace) a client's assignment with a fresh week sequence
pub async fn create_assignment(
    pool: &SqlitePool,
    client_id: &str,
    program: &WorkoutProgram,
    total_weeks: u32,
) -> Result<WorkoutAssignment, CoachError> {
    if total_weeks == 0 {
        return Err(CoachError::InvalidInput(
            "An assignment needs at least one week".to_string(),
        ));
    }

    let weeks = initialize_weeks(total_weeks, &program.days);
    let program_json = serde_json::to_string(program)?;
    let weeks_json = serde_json::to_string(&weeks)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO workout_assignments
            (client_id, total_weeks, program_json, weeks_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(client_id) DO UPDATE SET
            total_weeks = excluded.total_weeks,
            program_json = excluded.program_json,
            weeks_json = excluded.weeks_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(client_id)
    .bind(i64::from(total_weeks))
    .bind(&program_json)
    .bind(&weeks_json)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!(client_id, total_weeks, "Created workout assignment");

    load_assignment(pool, client_id).await
}

/// Load a client's assignment
pub async fn load_assignment(
    pool: &SqlitePool,
    client_id: &str,
) -> Result<WorkoutAssignment, CoachError> {
    let row = sqlx::query(
        r#"
        SELECT id, client_id, total_weeks, program_json, weeks_json, created_at, updated_at
        FROM workout_assignments
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| CoachError::NotFound(format!("No workout assignment for client {}", client_id)))?;

    let program_json: String = row.get("program_json");
    let weeks_json: String = row.get("weeks_json");
    let total_weeks: i64 = row.get("total_weeks");

    Ok(WorkoutAssignment {
        id: row.get("id"),
        client_id: row.get("client_id"),
        total_weeks: u32::try_from(total_weeks).map_err(|_| {
            CoachError::Database(format!("Invalid total_weeks {} for {}", total_weeks, client_id))
        })?,
        program: serde_json::from_str(&program_json)?,
        weeks: serde_json::from_str(&weeks_json)?,
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    })
}

/// Persist a client's week sequence
pub async fn save_assignment_weeks(
    pool: &SqlitePool,
    client_id: &str,
    weeks: &[Week],
) -> Result<(), CoachError> {
    let weeks_json = serde_json::to_string(weeks)?;

    let result = sqlx::query(
        "UPDATE workout_assignments SET weeks_json = ?, updated_at = ? WHERE client_id = ?",
    )
    .bind(&weeks_json)
    .bind(Utc::now().to_rfc3339())
    .bind(client_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoachError::NotFound(format!(
            "No workout assignment for client {}",
            client_id
        )));
    }
    Ok(())
}

/// Persist an edited program for a client's assignment
pub async fn save_assignment_program(
    pool: &SqlitePool,
    client_id: &str,
    program: &WorkoutProgram,
) -> Result<(), CoachError> {
    let program_json = serde_json::to_string(program)?;

    let result = sqlx::query(
        "UPDATE workout_assignments SET program_json = ?, updated_at = ? WHERE client_id = ?",
    )
    .bind(&program_json)
    .bind(Utc::now().to_rfc3339())
    .bind(client_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoachError::NotFound(format!(
            "No workout assignment for client {}",
            client_id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Progression Actions
// ---------------------------------------------------------------------------

/// Mark a client's week complete and persist the result.
///
/// Rejected transitions are returned as `success = false` and leave storage
/// untouched; only storage failures are errors.
pub async fn complete_week(
    pool: &SqlitePool,
    client_id: &str,
    week_number: u32,
) -> Result<WeekCompletion, CoachError> {
    let assignment = load_assignment(pool, client_id).await?;
    let completion = mark_week_complete(&assignment.weeks, week_number, assignment.total_weeks);

    if !completion.success {
        tracing::debug!(client_id, week_number, reason = %completion.message, "Week completion rejected");
        return Ok(completion);
    }

    save_assignment_weeks(pool, client_id, &completion.updated_weeks).await?;
    tracing::info!(
        client_id,
        week_number,
        current_week = completion.current_week,
        "Week completed"
    );

    Ok(completion)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
