//! Reconstruct a file's prior (status, stage) from its activity trail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::audit::Activity;
use crate::models::file::{FailureStage, FileStage, FileStatus};

/// One distinct state a file has been in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryState {
    pub status: FileStatus,
    pub stage: FileStage,
    pub failure_stage: Option<FailureStage>,
    pub at: DateTime<Utc>,
}

/// Distinct (status, stage) states, most recent first.
///
/// Only the newest activity row of each (status, stage) pair survives; ties
/// on timestamp are broken by the larger row id.
pub fn distinct_states(activities: &[Activity]) -> Vec<HistoryState> {
    let mut latest: HashMap<(&FileStatus, &FileStage), &Activity> = HashMap::new();
    for activity in activities.iter().filter(|a| a.is_active) {
        latest
            .entry((&activity.status, &activity.stage))
            .and_modify(|kept| {
                if (activity.created_at, activity.id) > (kept.created_at, kept.id) {
                    *kept = activity;
                }
            })
            .or_insert(activity);
    }

    let mut rows: Vec<&Activity> = latest.into_values().collect();
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    rows.into_iter()
        .map(|a| HistoryState {
            status: a.status.clone(),
            stage: a.stage.clone(),
            failure_stage: a.failure_stage.clone(),
            at: a.created_at,
        })
        .collect()
}

/// The state before the current one, or `None` with fewer than two distinct states.
pub fn previous_state(activities: &[Activity]) -> Option<HistoryState> {
    distinct_states(activities).into_iter().nth(1)
}

/// The most recent earlier state outside Ignored.
///
/// Commenting on an ignored file records a second Ignored state, so the
/// state directly before the current one can itself be Ignored.
pub fn restore_state(activities: &[Activity]) -> Option<HistoryState> {
    distinct_states(activities)
        .into_iter()
        .skip(1)
        .find(|state| state.status != FileStatus::Ignored)
}

/// Load a file's activities and resolve the state a restore returns to.
pub async fn load_restore_state(
    conn: &mut PgConnection,
    file_uid: Uuid,
) -> Result<Option<HistoryState>, AppError> {
    let activities = db::audit::list_activities(conn, file_uid).await?;
    Ok(restore_state(&activities))
}
