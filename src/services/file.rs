//! Read side of files: details with SLA and the audit trail.

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::audit::{Activity, ProcessLog};
use crate::models::file::FileRecord;
use crate::services::history::{self, HistoryState};
use crate::services::sla::{self, SlaResult};

/// A file with its SLA evaluation and the state it would restore to.
#[derive(Debug, Clone, Serialize)]
pub struct FileDetails {
    #[serde(flatten)]
    pub file: FileRecord,
    pub sla: SlaResult,
    pub previous_state: Option<HistoryState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileTrail {
    pub activities: Vec<Activity>,
    pub process_logs: Vec<ProcessLog>,
}

pub async fn details(pool: &PgPool, uid: Uuid) -> Result<FileDetails, AppError> {
    let mut conn = pool.acquire().await?;
    let file = db::files::find_by_uid(&mut conn, uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {uid} not found")))?;
    let thresholds = db::file_configurations::sla_map(&mut conn).await?;
    let activities = db::audit::list_activities(&mut conn, uid).await?;

    Ok(FileDetails {
        sla: sla::for_file(&file, &thresholds, Utc::now()),
        previous_state: history::previous_state(&activities),
        file,
    })
}

pub async fn trail(pool: &PgPool, uid: Uuid) -> Result<FileTrail, AppError> {
    let mut conn = pool.acquire().await?;
    if db::files::find_by_uid(&mut conn, uid).await?.is_none() {
        return Err(AppError::NotFound(format!("File {uid} not found")));
    }
    Ok(FileTrail {
        activities: db::audit::list_activities(&mut conn, uid).await?,
        process_logs: db::audit::list_process_logs(&mut conn, uid).await?,
    })
}
