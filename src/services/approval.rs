//! File approval once its accounts are linked.
//!
//! A file can be approved only when at least one of its extract records is
//! linked and not ignored, and no account identifier appears on more than
//! one of those records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::errors::{ActionResult, AppError};
use crate::models::extract::ExtractFile;
use crate::models::file::{FileRecord, FileStage, FileStatus, MANUAL_PROCESS};
use crate::services::audit::{self, AuditEntry};

pub const MSG_APPROVED: &str = "File Approved";
pub const MSG_NO_LINKED_ACCOUNT: &str = "Please link at least one account before approving the file";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApproveRequest {
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "actor is required"))]
    pub actor: String,
}

/// Check the linked accounts of a file before approval.
pub fn validate_extracts(extracts: &[ExtractFile]) -> Result<(), AppError> {
    let linked: Vec<&ExtractFile> = extracts
        .iter()
        .filter(|e| e.is_active && e.is_linked && !e.is_ignored)
        .collect();

    if linked.is_empty() {
        return Err(AppError::Validation(MSG_NO_LINKED_ACCOUNT.to_string()));
    }

    let mut seen = HashSet::new();
    for sid in linked
        .iter()
        .filter_map(|e| e.account_sid.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !seen.insert(sid) {
            return Err(AppError::Validation(format!(
                "SID {sid} linked to multiple accounts"
            )));
        }
    }
    Ok(())
}

pub fn plan_approve(
    file: &mut FileRecord,
    actor: &str,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> AuditEntry {
    file.move_to(FileStatus::Approved, FileStage::Approved, at);
    file.file_process_stage = Some(MANUAL_PROCESS.to_string());
    file.status_comment = Some(MSG_APPROVED.to_string());
    if let Some(text) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        file.comments = Some(text.to_string());
    }
    file.updated_by = Some(actor.to_string());
    AuditEntry::for_file(file, MSG_APPROVED, actor, at).with_comment(comment)
}

/// Approve a file after checking its linked accounts.
pub async fn approve(
    pool: &PgPool,
    uid: Uuid,
    req: &ApproveRequest,
) -> Result<ActionResult<FileRecord>, AppError> {
    let mut tx = pool.begin().await?;
    let mut file = db::files::lock_by_uid(&mut *tx, uid).await?;
    let extracts = db::extracts::list_for_file(&mut *tx, uid).await?;
    validate_extracts(&extracts)?;

    let entry = plan_approve(&mut file, &req.actor, req.comment.as_deref(), Utc::now());
    audit::apply(&mut *tx, &file, &[entry]).await?;
    tx.commit().await?;

    tracing::info!(file_uid = %uid, actor = %req.actor, "File approved");
    Ok(ActionResult::ok(MSG_APPROVED, 1, Some(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file::fixtures::file;

    fn extract(id: i64, sid: Option<&str>, linked: bool, ignored: bool) -> ExtractFile {
        ExtractFile {
            id,
            file_uid: Uuid::nil(),
            account: Some(format!("Account {id}")),
            account_uid: None,
            account_sid: sid.map(str::to_string),
            business_date: None,
            is_linked: linked,
            is_ignored: ignored,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_extracts_is_rejected() {
        let err = validate_extracts(&[]).unwrap_err();
        assert_eq!(err.result_code(), "400");
        assert!(err.to_string().contains("Please link at least one account"));
    }

    #[test]
    fn only_ignored_or_unlinked_is_rejected() {
        let rows = vec![
            extract(1, Some("ACC-1"), false, false),
            extract(2, Some("ACC-2"), true, true),
        ];
        assert!(validate_extracts(&rows).is_err());
    }

    #[test]
    fn duplicate_sid_names_the_account() {
        let rows = vec![
            extract(1, Some("ACC-1"), true, false),
            extract(2, Some("ACC-1"), true, false),
        ];
        let err = validate_extracts(&rows).unwrap_err();
        assert_eq!(err.result_code(), "400");
        assert!(err.to_string().contains("SID ACC-1 linked to multiple accounts"));
    }

    #[test]
    fn duplicate_sid_on_ignored_row_is_fine() {
        let rows = vec![
            extract(1, Some("ACC-1"), true, false),
            extract(2, Some("ACC-1"), true, true),
        ];
        assert!(validate_extracts(&rows).is_ok());
    }

    #[test]
    fn distinct_sids_pass() {
        let rows = vec![
            extract(1, Some("ACC-1"), true, false),
            extract(2, Some("ACC-2"), true, false),
            extract(3, None, true, false),
        ];
        assert!(validate_extracts(&rows).is_ok());
    }

    #[test]
    fn approve_sets_state_and_comment() {
        let mut f = file(FileStatus::Linked, FileStage::AccountIdentification);
        let entry = plan_approve(&mut f, "checker", Some("all accounts verified"), Utc::now());
        assert_eq!(f.status, FileStatus::Approved);
        assert_eq!(f.stage, FileStage::Approved);
        assert_eq!(f.status_comment.as_deref(), Some("File Approved"));
        assert_eq!(f.comments.as_deref(), Some("all accounts verified"));
        assert_eq!(entry.activity_row().status_comment.as_deref(), Some("all accounts verified"));
        assert_eq!(entry.process_log_row().status_comment.as_deref(), Some("File Approved"));
    }
}
