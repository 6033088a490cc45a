//! Per-transition audit rows: the process log and the activity trail.
//!
//! Both rows are written for every file transition. The process log keeps
//! the system message in `status_comment`; the activity row keeps the user's
//! comment in `status_comment` and the system message in `comment`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::file::{FailureStage, FileStage, FileStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessLog {
    pub id: i64,
    pub file_uid: Uuid,
    pub status: FileStatus,
    pub stage: FileStage,
    pub classification: Option<String>,
    pub rule_id: Option<String>,
    pub status_comment: Option<String>,
    pub file_process_stage: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub file_uid: Uuid,
    pub status: FileStatus,
    pub stage: FileStage,
    pub failure_stage: Option<FailureStage>,
    pub file_process_stage: Option<String>,
    pub status_comment: Option<String>,
    pub comment: Option<String>,
    pub is_commented: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Insert shape of a process log row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProcessLog {
    pub file_uid: Uuid,
    pub status: FileStatus,
    pub stage: FileStage,
    pub classification: Option<String>,
    pub rule_id: Option<String>,
    pub status_comment: Option<String>,
    pub file_process_stage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Insert shape of an activity row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub file_uid: Uuid,
    pub status: FileStatus,
    pub stage: FileStage,
    pub failure_stage: Option<FailureStage>,
    pub file_process_stage: Option<String>,
    pub status_comment: Option<String>,
    pub comment: Option<String>,
    pub is_commented: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}
