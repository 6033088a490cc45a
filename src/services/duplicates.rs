//! Resolution of an update file against the file it would supersede.
//!
//! When a newer version of a file arrives it is held at status `Update`
//! next to the original. The user either keeps the update (the update
//! re-enters extraction and the original is ignored) or discards it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::errors::{ActionResult, AppError};
use crate::models::file::{FileRecord, FileStage, FileStatus, MANUAL_PROCESS};
use crate::services::audit::{self, AuditEntry};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveUpdateRequest {
    pub selected_file_uid: Uuid,
    pub ignored_file_uid: Uuid,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// The update was kept and the original ignored.
    UpdateAccepted,
    /// The other file was discarded; the selected file is untouched.
    Discarded,
}

/// Planned outcome for both files of the pair.
#[derive(Debug, Clone)]
pub struct ResolvePlan {
    pub resolution: Resolution,
    pub selected_entry: AuditEntry,
    pub ignored_entry: AuditEntry,
}

fn ignore_superseded(file: &mut FileRecord, actor: &str, message: &str, at: DateTime<Utc>) {
    file.move_to(FileStatus::Ignored, FileStage::Ignored, at);
    file.failure_stage = None;
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.ignored_by = Some(actor.to_string());
    file.ignored_on = Some(at);
    file.status_comment = Some(message.to_string());
    file.updated_by = Some(actor.to_string());
}

/// Decide how the pair is resolved, mutating both records in memory.
pub fn plan_resolve(
    selected: &mut FileRecord,
    ignored: &mut FileRecord,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<ResolvePlan, AppError> {
    let (s_uid, i_uid) = (selected.file_uid, ignored.file_uid);

    if selected.status == FileStatus::Update {
        if matches!(ignored.status, FileStatus::Ingested | FileStatus::Completed) {
            return Err(AppError::Validation(format!(
                "File {i_uid} has already been ingested. Please edit in place instead."
            )));
        }

        let selected_msg = format!("Update {s_uid} accepted, superseding file {i_uid}");
        selected.move_to(FileStatus::Extract, FileStage::ExtractReceived, at);
        selected.update_file_uid = Some(i_uid);
        selected.file_process_stage = Some(MANUAL_PROCESS.to_string());
        selected.status_comment = Some(selected_msg.clone());
        selected.updated_by = Some(actor.to_string());

        let ignored_msg = format!("File {i_uid} superseded by update {s_uid}");
        ignore_superseded(ignored, actor, &ignored_msg, at);
        ignored.duplicate_file_uid = Some(s_uid);

        return Ok(ResolvePlan {
            resolution: Resolution::UpdateAccepted,
            selected_entry: AuditEntry::for_file(selected, selected_msg, actor, at),
            ignored_entry: AuditEntry::for_file(ignored, ignored_msg, actor, at),
        });
    }

    let ignored_msg = format!("File {i_uid} discarded by user in favour of {s_uid}");
    ignore_superseded(ignored, actor, &ignored_msg, at);
    ignored.duplicate_file_uid = Some(s_uid);
    let selected_msg = format!("File {s_uid} kept, {i_uid} discarded by user");

    Ok(ResolvePlan {
        resolution: Resolution::Discarded,
        selected_entry: AuditEntry::for_file(selected, selected_msg, actor, at),
        ignored_entry: AuditEntry::for_file(ignored, ignored_msg, actor, at),
    })
}

/// Resolve an update pair in a single transaction.
pub async fn resolve_update(
    pool: &PgPool,
    req: &ResolveUpdateRequest,
) -> Result<ActionResult<Resolution>, AppError> {
    if req.selected_file_uid == req.ignored_file_uid {
        return Err(AppError::Validation(
            "Selected and ignored files must differ".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Lock in a stable order so opposite requests cannot deadlock.
    let (first, second) = if req.selected_file_uid < req.ignored_file_uid {
        (req.selected_file_uid, req.ignored_file_uid)
    } else {
        (req.ignored_file_uid, req.selected_file_uid)
    };
    let a = db::files::lock_by_uid(&mut *tx, first).await?;
    let b = db::files::lock_by_uid(&mut *tx, second).await?;
    let (mut selected, mut ignored) = if a.file_uid == req.selected_file_uid {
        (a, b)
    } else {
        (b, a)
    };

    let plan = plan_resolve(&mut selected, &mut ignored, &req.actor, Utc::now())?;

    if plan.resolution == Resolution::UpdateAccepted {
        db::files::save_state(&mut *tx, &selected).await?;
    }
    audit::record(&mut *tx, &plan.selected_entry).await?;
    audit::apply(&mut *tx, &ignored, &[plan.ignored_entry.clone()]).await?;
    tx.commit().await?;

    tracing::info!(
        selected = %req.selected_file_uid,
        ignored = %req.ignored_file_uid,
        resolution = ?plan.resolution,
        "Update resolved"
    );

    let message = match plan.resolution {
        Resolution::UpdateAccepted => "Update accepted",
        Resolution::Discarded => "File discarded",
    };
    Ok(ActionResult::ok(message, 2, Some(plan.resolution)))
}
