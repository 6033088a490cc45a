//! Dual audit trail for file transitions.
//!
//! Every transition produces one [`AuditEntry`] which is written as a process
//! log row and an activity row sharing file UID and timestamp. The two rows
//! name their comment columns differently: the process log's
//! `status_comment` holds the system message, while the activity's
//! `status_comment` holds the user's comment and `comment` holds the system
//! message. Callers write both inside the transaction that mutates the file.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::audit::{NewActivity, NewProcessLog};
use crate::models::file::{FailureStage, FileRecord, FileStage, FileStatus};

/// One logical transition of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub file_uid: Uuid,
    pub status: FileStatus,
    pub stage: FileStage,
    pub failure_stage: Option<FailureStage>,
    pub classification: Option<String>,
    pub rule_id: Option<String>,
    pub system_message: String,
    pub user_comment: Option<String>,
    pub file_process_stage: Option<String>,
    pub is_commented: bool,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    /// Snapshot `file`'s current state with a system message.
    pub fn for_file(file: &FileRecord, message: impl Into<String>, actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            file_uid: file.file_uid,
            status: file.status.clone(),
            stage: file.stage.clone(),
            failure_stage: file.failure_stage.clone(),
            classification: file.rule_classification.clone(),
            rule_id: None,
            system_message: message.into(),
            user_comment: None,
            file_process_stage: file.file_process_stage.clone(),
            is_commented: false,
            actor: actor.to_string(),
            at,
        }
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach the user's comment. Blank comments are dropped.
    pub fn with_comment(mut self, comment: Option<&str>) -> Self {
        self.user_comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    pub fn commented(mut self) -> Self {
        self.is_commented = true;
        self
    }

    pub fn process_log_row(&self) -> NewProcessLog {
        NewProcessLog {
            file_uid: self.file_uid,
            status: self.status.clone(),
            stage: self.stage.clone(),
            classification: self.classification.clone(),
            rule_id: self.rule_id.clone(),
            status_comment: Some(self.system_message.clone()),
            file_process_stage: self.file_process_stage.clone(),
            created_at: self.at,
            created_by: self.actor.clone(),
        }
    }

    pub fn activity_row(&self) -> NewActivity {
        NewActivity {
            file_uid: self.file_uid,
            status: self.status.clone(),
            stage: self.stage.clone(),
            failure_stage: self.failure_stage.clone(),
            file_process_stage: self.file_process_stage.clone(),
            status_comment: self.user_comment.clone(),
            comment: Some(self.system_message.clone()),
            is_commented: self.is_commented,
            created_at: self.at,
            created_by: self.actor.clone(),
        }
    }
}

/// Write both audit rows for `entry`.
pub async fn record(conn: &mut PgConnection, entry: &AuditEntry) -> Result<(), AppError> {
    db::audit::insert_process_log(&mut *conn, &entry.process_log_row()).await?;
    db::audit::insert_activity(&mut *conn, &entry.activity_row()).await?;
    Ok(())
}

/// Persist a planned file mutation and its audit entries.
pub async fn apply(
    conn: &mut PgConnection,
    file: &FileRecord,
    entries: &[AuditEntry],
) -> Result<(), AppError> {
    db::files::save_state(&mut *conn, file).await?;
    for entry in entries {
        record(&mut *conn, entry).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file::fixtures::file;

    fn entry() -> AuditEntry {
        let f = file(FileStatus::Approved, FileStage::Approved);
        AuditEntry::for_file(&f, "File Approved", "jdoe", Utc::now()).with_comment(Some("looks good"))
    }

    #[test]
    fn process_log_carries_system_message() {
        let row = entry().process_log_row();
        assert_eq!(row.status_comment.as_deref(), Some("File Approved"));
    }

    #[test]
    fn activity_splits_user_and_system_text() {
        let row = entry().activity_row();
        assert_eq!(row.status_comment.as_deref(), Some("looks good"));
        assert_eq!(row.comment.as_deref(), Some("File Approved"));
    }

    #[test]
    fn both_rows_share_uid_and_timestamp() {
        let e = entry();
        let log = e.process_log_row();
        let act = e.activity_row();
        assert_eq!(log.file_uid, act.file_uid);
        assert_eq!(log.created_at, act.created_at);
        assert_eq!(log.created_by, "jdoe");
        assert_eq!(act.created_by, "jdoe");
    }

    #[test]
    fn blank_comment_is_dropped() {
        let f = file(FileStatus::Captured, FileStage::DocReady);
        let e = AuditEntry::for_file(&f, "x", "jdoe", Utc::now()).with_comment(Some("   "));
        assert!(e.user_comment.is_none());
        assert!(e.activity_row().status_comment.is_none());
    }

    #[test]
    fn rule_id_goes_to_process_log_only() {
        let f = file(FileStatus::Ignored, FileStage::Ignored);
        let e = AuditEntry::for_file(&f, "File match With ignored Rule", "SYSTEM", Utc::now())
            .with_rule("IG0003");
        assert_eq!(e.process_log_row().rule_id.as_deref(), Some("IG0003"));
    }

    #[test]
    fn failure_stage_goes_to_activity() {
        let mut f = file(FileStatus::Failed, FileStage::DocReady);
        f.failure_stage = Some(FailureStage::FailedCapture);
        let e = AuditEntry::for_file(&f, "x", "jdoe", Utc::now());
        assert_eq!(e.activity_row().failure_stage, Some(FailureStage::FailedCapture));
    }
}
