//! Manual lifecycle actions: ignore, restore from ignored, replay, comment.
//!
//! Each action is split into a pure planning step that mutates a
//! [`FileRecord`] in memory and returns the audit entry, and an async step
//! that persists file and audit rows in one transaction. Bulk actions run
//! every file in its own transaction; a failing file is logged and left out
//! of the count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::errors::{ActionResult, AppError};
use crate::models::file::{FailureStage, FileRecord, FileStage, FileStatus, MANUAL_PROCESS};
use crate::services::audit::{self, AuditEntry};
use crate::services::history::{self, HistoryState};

pub const MSG_MANUAL_IGNORE: &str = "Manually moved to Ignored";
pub const MSG_COMMENT_ADDED: &str = "Comment Added";
pub const MSG_NOTHING_PROCESSED: &str = "No files processed";

/// Bulk status change request. `file_uids` is a comma-separated list.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    #[validate(length(min = 1, message = "file_uids is required"))]
    pub file_uids: String,
    pub status: String,
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

/// Bulk replay request. `file_uids` is a comma-separated list.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReplayRequest {
    #[validate(length(min = 1, message = "file_uids is required"))]
    pub file_uids: String,
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, message = "comment is required"))]
    pub comment: String,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

/// What a status update request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusAction {
    Ignore,
    Restore,
}

impl StatusAction {
    pub fn parse(target: &str) -> Result<Self, AppError> {
        match target.trim().to_ascii_lowercase().as_str() {
            "ignored" | "ignore" => Ok(Self::Ignore),
            "restore" | "restored" | "unignore" | "unignored" => Ok(Self::Restore),
            other => Err(AppError::Validation(format!(
                "Unsupported target status '{other}'"
            ))),
        }
    }
}

/// Parse a comma-separated UID list, skipping blanks and malformed entries.
pub fn parse_uids(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match Uuid::parse_str(s) {
            Ok(uid) => Some(uid),
            Err(e) => {
                tracing::warn!(value = %s, error = %e, "Skipping malformed file UID");
                None
            }
        })
        .collect()
}

// -- Planning --

/// Move `file` to Ignored by hand.
pub fn plan_ignore(
    file: &mut FileRecord,
    actor: &str,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> AuditEntry {
    file.move_to(FileStatus::Ignored, FileStage::Ignored, at);
    file.failure_stage = None;
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.ignored_by = Some(actor.to_string());
    file.ignored_on = Some(at);
    file.status_comment = Some(MSG_MANUAL_IGNORE.to_string());
    file.updated_by = Some(actor.to_string());
    AuditEntry::for_file(file, MSG_MANUAL_IGNORE, actor, at).with_comment(comment)
}

/// State a restore returns to, given the file's previous state.
pub fn restore_target(previous: &HistoryState) -> (FileStatus, FileStage, Option<FailureStage>) {
    if previous.status == FileStatus::Failed {
        if let Some(failure) = previous.failure_stage.as_ref().filter(|f| f.is_recognized()) {
            return (FileStatus::Failed, previous.stage.clone(), Some(failure.clone()));
        }
    }
    if previous.status == FileStatus::Captured && previous.stage == FileStage::DocReady {
        return (FileStatus::Captured, FileStage::DocReady, None);
    }
    let status = match &previous.status {
        FileStatus::IngestionInProgress => FileStatus::Approved,
        other => other.clone(),
    };
    let stage = match &previous.stage {
        FileStage::IngestionInProgress => FileStage::Approved,
        other => other.clone(),
    };
    (status, stage, None)
}

/// Restore an ignored file to `previous`, its latest state outside Ignored.
///
/// Returns `None` when there is nothing to restore: the file is not ignored,
/// or the history holds no earlier state outside Ignored.
pub fn plan_restore(
    file: &mut FileRecord,
    previous: Option<&HistoryState>,
    actor: &str,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> Option<AuditEntry> {
    if file.status != FileStatus::Ignored {
        return None;
    }
    let previous = previous.filter(|p| p.status != FileStatus::Ignored)?;
    let (status, stage, failure_stage) = restore_target(previous);

    let message = format!("Restored from Ignored to {status}");
    file.move_to(status, stage, at);
    file.failure_stage = failure_stage;
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.ignored_by = None;
    file.ignored_on = None;
    file.status_comment = Some(message.clone());
    file.updated_by = Some(actor.to_string());
    Some(AuditEntry::for_file(file, message, actor, at).with_comment(comment))
}

/// Where a failed file re-enters the pipeline, and whether it is flagged as a replay.
pub fn replay_target(failure: &FailureStage) -> Option<(FileStatus, FileStage, bool)> {
    match failure {
        FailureStage::FailedLinking => Some((FileStatus::Extract, FileStage::ExtractReceived, false)),
        FailureStage::FailedExtraction => Some((FileStatus::Captured, FileStage::DocReady, true)),
        FailureStage::FailedIngestion => Some((FileStatus::Approved, FileStage::Approved, false)),
        FailureStage::FailedCapture => Some((FileStatus::Captured, FileStage::DocReady, false)),
        FailureStage::Unrecognized(_) => None,
    }
}

/// Replay a failed file. Returns `None` for files that are not replayable.
pub fn plan_replay(
    file: &mut FileRecord,
    actor: &str,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> Option<AuditEntry> {
    if file.status != FileStatus::Failed {
        return None;
    }
    let failure = file.failure_stage.clone()?;
    let (status, stage, replay) = replay_target(&failure)?;

    let reason = format!("File replayed from {failure} to {status}");
    file.move_to(status, stage, at);
    file.failure_stage = None;
    if replay {
        file.replay = true;
    }
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.reason = Some(reason.clone());
    file.status_comment = Some(reason.clone());
    file.updated_by = Some(actor.to_string());
    Some(AuditEntry::for_file(file, reason, actor, at).with_comment(comment))
}

/// Attach a user comment to `file`.
pub fn plan_comment(file: &mut FileRecord, text: &str, actor: &str, at: DateTime<Utc>) -> AuditEntry {
    file.move_to(file.status.clone(), FileStage::Manual, at);
    file.comments = Some(text.to_string());
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.status_comment = Some(MSG_COMMENT_ADDED.to_string());
    file.updated_by = Some(actor.to_string());
    AuditEntry::for_file(file, MSG_COMMENT_ADDED, actor, at)
        .with_comment(Some(text))
        .commented()
}

// -- Execution --

/// Apply an ignore or restore to every UID in the request.
pub async fn update_status(
    pool: &PgPool,
    req: &StatusUpdateRequest,
) -> Result<ActionResult<Vec<Uuid>>, AppError> {
    let action = StatusAction::parse(&req.status)?;
    let uids = parse_uids(&req.file_uids);
    let comment = req.comment.as_deref();

    let mut changed = Vec::new();
    for uid in uids {
        let outcome = match action {
            StatusAction::Ignore => ignore_one(pool, uid, &req.actor, comment).await,
            StatusAction::Restore => restore_one(pool, uid, &req.actor, comment).await,
        };
        match outcome {
            Ok(true) => changed.push(uid),
            Ok(false) => {
                tracing::info!(file_uid = %uid, action = ?action, "Nothing to change for file")
            }
            Err(e) => {
                tracing::warn!(file_uid = %uid, action = ?action, error = %e, "Status update failed")
            }
        }
    }

    if changed.is_empty() {
        return Ok(ActionResult::nothing_processed(MSG_NOTHING_PROCESSED));
    }
    let count = changed.len();
    let message = match action {
        StatusAction::Ignore => format!("{count} files moved to Ignored"),
        StatusAction::Restore => format!("{count} files restored"),
    };
    Ok(ActionResult::ok(message, count, Some(changed)))
}

async fn ignore_one(
    pool: &PgPool,
    uid: Uuid,
    actor: &str,
    comment: Option<&str>,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;
    let mut file = db::files::lock_by_uid(&mut *tx, uid).await?;
    let entry = plan_ignore(&mut file, actor, comment, Utc::now());
    audit::apply(&mut *tx, &file, &[entry]).await?;
    tx.commit().await?;
    Ok(true)
}

async fn restore_one(
    pool: &PgPool,
    uid: Uuid,
    actor: &str,
    comment: Option<&str>,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;
    let mut file = db::files::lock_by_uid(&mut *tx, uid).await?;
    let previous = history::load_restore_state(&mut *tx, uid).await?;
    let Some(entry) = plan_restore(&mut file, previous.as_ref(), actor, comment, Utc::now()) else {
        return Ok(false);
    };
    audit::apply(&mut *tx, &file, &[entry]).await?;
    tx.commit().await?;
    Ok(true)
}

/// Replay every failed file in the request.
pub async fn replay(pool: &PgPool, req: &ReplayRequest) -> Result<ActionResult<Vec<Uuid>>, AppError> {
    let mut replayed = Vec::new();
    for uid in parse_uids(&req.file_uids) {
        match replay_one(pool, uid, &req.actor, req.comment.as_deref()).await {
            Ok(true) => replayed.push(uid),
            Ok(false) => tracing::info!(file_uid = %uid, "File is not replayable, skipping"),
            Err(e) => tracing::warn!(file_uid = %uid, error = %e, "Replay failed"),
        }
    }

    if replayed.is_empty() {
        return Ok(ActionResult::nothing_processed(MSG_NOTHING_PROCESSED));
    }
    let count = replayed.len();
    Ok(ActionResult::ok(format!("{count} files replayed"), count, Some(replayed)))
}

async fn replay_one(
    pool: &PgPool,
    uid: Uuid,
    actor: &str,
    comment: Option<&str>,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;
    let mut file = db::files::lock_by_uid(&mut *tx, uid).await?;
    let Some(entry) = plan_replay(&mut file, actor, comment, Utc::now()) else {
        return Ok(false);
    };
    audit::apply(&mut *tx, &file, &[entry]).await?;
    tx.commit().await?;
    Ok(true)
}

/// Store a comment on a file, atomically with its audit rows.
pub async fn add_comment(
    pool: &PgPool,
    uid: Uuid,
    req: &CommentRequest,
) -> Result<ActionResult<FileRecord>, AppError> {
    let text = req.comment.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }

    let mut tx = pool.begin().await?;
    let mut file = db::files::lock_by_uid(&mut *tx, uid).await?;
    let entry = plan_comment(&mut file, text, &req.actor, Utc::now());
    audit::apply(&mut *tx, &file, &[entry]).await?;
    tx.commit().await?;

    tracing::info!(file_uid = %uid, actor = %req.actor, "Comment added");
    Ok(ActionResult::ok(MSG_COMMENT_ADDED, 1, Some(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file::fixtures::file;
    use crate::services::history::fixtures::activity;

    fn state(status: FileStatus, stage: FileStage, failure: Option<FailureStage>) -> HistoryState {
        HistoryState {
            status,
            stage,
            failure_stage: failure,
            at: Utc::now(),
        }
    }

    fn failed(failure: FailureStage) -> FileRecord {
        let mut f = file(FileStatus::Failed, FileStage::DocReady);
        f.failure_stage = Some(failure);
        f
    }

    // -- Request parsing --

    #[test]
    fn status_targets() {
        assert_eq!(StatusAction::parse("Ignored").unwrap(), StatusAction::Ignore);
        assert_eq!(StatusAction::parse("restore").unwrap(), StatusAction::Restore);
        assert_eq!(StatusAction::parse("Unignore").unwrap(), StatusAction::Restore);
        assert!(StatusAction::parse("Approved").is_err());
    }

    #[test]
    fn uid_list_skips_garbage() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!(" {a}, ,not-a-uid,{b},");
        assert_eq!(parse_uids(&raw), vec![a, b]);
        assert!(parse_uids("").is_empty());
    }

    // -- Manual ignore --

    #[test]
    fn ignore_stamps_actor_and_clears_failure() {
        let mut f = failed(FailureStage::FailedLinking);
        let entry = plan_ignore(&mut f, "jdoe", Some("not needed"), Utc::now());
        assert_eq!(f.status, FileStatus::Ignored);
        assert_eq!(f.stage, FileStage::Ignored);
        assert!(f.failure_stage.is_none());
        assert_eq!(f.ignored_by.as_deref(), Some("jdoe"));
        assert!(f.ignored_on.is_some());
        assert_eq!(entry.system_message, MSG_MANUAL_IGNORE);
        assert_eq!(entry.user_comment.as_deref(), Some("not needed"));
    }

    // -- Restore --

    #[test]
    fn restore_failed_keeps_failure_stage() {
        let prev = state(
            FileStatus::Failed,
            FileStage::ExtractReceived,
            Some(FailureStage::FailedLinking),
        );
        assert_eq!(
            restore_target(&prev),
            (
                FileStatus::Failed,
                FileStage::ExtractReceived,
                Some(FailureStage::FailedLinking)
            )
        );
    }

    #[test]
    fn restore_failed_with_unknown_failure_falls_through() {
        let prev = state(
            FileStatus::Failed,
            FileStage::ExtractReceived,
            Some(FailureStage::Unrecognized("Failed Parsing".into())),
        );
        assert_eq!(
            restore_target(&prev),
            (FileStatus::Failed, FileStage::ExtractReceived, None)
        );
    }

    #[test]
    fn restore_captured_doc_ready() {
        let prev = state(FileStatus::Captured, FileStage::DocReady, None);
        assert_eq!(
            restore_target(&prev),
            (FileStatus::Captured, FileStage::DocReady, None)
        );
    }

    #[test]
    fn restore_maps_ingestion_in_progress_to_approved() {
        let prev = state(
            FileStatus::IngestionInProgress,
            FileStage::IngestionInProgress,
            None,
        );
        assert_eq!(
            restore_target(&prev),
            (FileStatus::Approved, FileStage::Approved, None)
        );
    }

    #[test]
    fn restore_other_states_verbatim() {
        let prev = state(FileStatus::Linked, FileStage::ManualLink, None);
        assert_eq!(
            restore_target(&prev),
            (FileStatus::Linked, FileStage::ManualLink, None)
        );
    }

    #[test]
    fn restore_clears_ignore_stamp() {
        let mut f = file(FileStatus::Captured, FileStage::ExtractReady);
        plan_ignore(&mut f, "jdoe", None, Utc::now());
        let prev = state(FileStatus::Captured, FileStage::ExtractReady, None);
        let entry = plan_restore(&mut f, Some(&prev), "jdoe", None, Utc::now()).unwrap();
        assert_eq!(f.status, FileStatus::Captured);
        assert_eq!(f.stage, FileStage::ExtractReady);
        assert!(f.ignored_by.is_none());
        assert!(f.ignored_on.is_none());
        assert_eq!(entry.system_message, "Restored from Ignored to Captured");
    }

    #[test]
    fn restore_without_history_is_noop() {
        let mut f = file(FileStatus::Ignored, FileStage::Ignored);
        let before = f.clone();
        assert!(plan_restore(&mut f, None, "jdoe", None, Utc::now()).is_none());
        assert_eq!(f.stage, before.stage);
        assert_eq!(f.status, before.status);
    }

    #[test]
    fn restore_to_another_ignored_state_is_noop() {
        let mut f = file(FileStatus::Ignored, FileStage::Manual);
        let prev = state(FileStatus::Ignored, FileStage::Ignored, None);
        assert!(plan_restore(&mut f, Some(&prev), "jdoe", None, Utc::now()).is_none());
    }

    #[test]
    fn restore_after_comment_on_ignored_file() {
        let mut f = file(FileStatus::Captured, FileStage::ExtractReady);
        let mut rows = vec![activity(1, f.status.clone(), f.stage.clone(), 0)];
        plan_ignore(&mut f, "jdoe", None, Utc::now());
        rows.push(activity(2, f.status.clone(), f.stage.clone(), 1));
        plan_comment(&mut f, "checking with the sender", "jdoe", Utc::now());
        rows.push(activity(3, f.status.clone(), f.stage.clone(), 2));
        assert_eq!(f.status, FileStatus::Ignored);
        assert_eq!(f.stage, FileStage::Manual);

        let prev = history::restore_state(&rows);
        let entry = plan_restore(&mut f, prev.as_ref(), "jdoe", None, Utc::now()).unwrap();
        assert_eq!(f.status, FileStatus::Captured);
        assert_eq!(f.stage, FileStage::ExtractReady);
        assert_eq!(entry.system_message, "Restored from Ignored to Captured");
    }

    #[test]
    fn restore_requires_ignored_file() {
        let mut f = file(FileStatus::Approved, FileStage::Approved);
        let prev = state(FileStatus::Captured, FileStage::DocReady, None);
        assert!(plan_restore(&mut f, Some(&prev), "jdoe", None, Utc::now()).is_none());
    }

    #[test]
    fn restore_never_lands_outside_history_or_approved() {
        let priors = [
            state(FileStatus::Captured, FileStage::DocReady, None),
            state(FileStatus::Linked, FileStage::ManualLink, None),
            state(FileStatus::Extract, FileStage::ExtractReceived, None),
            state(
                FileStatus::IngestionInProgress,
                FileStage::IngestionInProgress,
                None,
            ),
            state(
                FileStatus::Failed,
                FileStage::Approved,
                Some(FailureStage::FailedIngestion),
            ),
        ];
        for prev in priors {
            let (status, stage, _) = restore_target(&prev);
            let from_history = status == prev.status && stage == prev.stage;
            let approved = status == FileStatus::Approved && stage == FileStage::Approved;
            assert!(from_history || approved, "{prev:?}");
        }
    }

    // -- Replay --

    #[test]
    fn replay_failed_capture() {
        let mut f = failed(FailureStage::FailedCapture);
        let entry = plan_replay(&mut f, "ops", None, Utc::now()).unwrap();
        assert_eq!(f.status, FileStatus::Captured);
        assert_eq!(f.stage, FileStage::DocReady);
        assert!(f.failure_stage.is_none());
        assert!(!f.replay);
        assert!(f.reason.as_deref().unwrap().ends_with("Failed Capture to Captured"));
        assert_eq!(entry.status, FileStatus::Captured);
    }

    #[test]
    fn replay_failed_extraction_sets_flag() {
        let mut f = failed(FailureStage::FailedExtraction);
        plan_replay(&mut f, "ops", None, Utc::now()).unwrap();
        assert_eq!((f.status.clone(), f.stage.clone()), (FileStatus::Captured, FileStage::DocReady));
        assert!(f.replay);
    }

    #[test]
    fn replay_failed_linking_and_ingestion() {
        let mut linking = failed(FailureStage::FailedLinking);
        plan_replay(&mut linking, "ops", None, Utc::now()).unwrap();
        assert_eq!(linking.status, FileStatus::Extract);
        assert_eq!(linking.stage, FileStage::ExtractReceived);

        let mut ingestion = failed(FailureStage::FailedIngestion);
        plan_replay(&mut ingestion, "ops", None, Utc::now()).unwrap();
        assert_eq!(ingestion.status, FileStatus::Approved);
        assert_eq!(ingestion.stage, FileStage::Approved);
    }

    #[test]
    fn replay_skips_non_failed_and_unknown() {
        let mut ok = file(FileStatus::Captured, FileStage::DocReady);
        ok.failure_stage = Some(FailureStage::FailedCapture);
        assert!(plan_replay(&mut ok, "ops", None, Utc::now()).is_none());

        let mut unknown = failed(FailureStage::Unrecognized("Failed Parsing".into()));
        assert!(plan_replay(&mut unknown, "ops", None, Utc::now()).is_none());
        assert_eq!(unknown.status, FileStatus::Failed);

        let mut bare = file(FileStatus::Failed, FileStage::DocReady);
        assert!(plan_replay(&mut bare, "ops", None, Utc::now()).is_none());
    }

    #[test]
    fn replay_covers_every_recognized_failure() {
        for failure in [
            FailureStage::FailedCapture,
            FailureStage::FailedExtraction,
            FailureStage::FailedLinking,
            FailureStage::FailedIngestion,
        ] {
            let mut f = failed(failure.clone());
            assert!(plan_replay(&mut f, "ops", None, Utc::now()).is_some(), "{failure}");
            assert!(f.failure_stage.is_none());
        }
    }

    // -- Comment --

    #[test]
    fn comment_moves_to_manual_stage() {
        let mut f = file(FileStatus::Linked, FileStage::ManualLink);
        let entry = plan_comment(&mut f, "checked with desk", "jdoe", Utc::now());
        assert_eq!(f.status, FileStatus::Linked);
        assert_eq!(f.stage, FileStage::Manual);
        assert_eq!(f.comments.as_deref(), Some("checked with desk"));
        assert_eq!(f.status_comment.as_deref(), Some("Comment Added"));
        assert!(entry.is_commented);
        assert_eq!(entry.activity_row().status_comment.as_deref(), Some("checked with desk"));
        assert_eq!(entry.process_log_row().status_comment.as_deref(), Some("Comment Added"));
    }
}
