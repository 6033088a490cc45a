//! File record, lifecycle enums and harvested metadata.

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// -- Lifecycle enums --

/// Pipeline status of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileStatus {
    New,
    Captured,
    Extract,
    Update,
    Pending,
    Linked,
    Approved,
    IngestionInProgress,
    Ingested,
    Completed,
    Failed,
    Ignored,
    Duplicate,
    /// A stored value this build does not know. Kept verbatim.
    Unrecognized(String),
}

impl FileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Captured => "Captured",
            Self::Extract => "Extract",
            Self::Update => "Update",
            Self::Pending => "Pending",
            Self::Linked => "Linked",
            Self::Approved => "Approved",
            Self::IngestionInProgress => "Ingestion In Progress",
            Self::Ingested => "Ingested",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Ignored => "Ignored",
            Self::Duplicate => "Duplicate",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl FromStr for FileStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "New" => Self::New,
            "Captured" => Self::Captured,
            "Extract" => Self::Extract,
            "Update" => Self::Update,
            "Pending" => Self::Pending,
            "Linked" => Self::Linked,
            "Approved" => Self::Approved,
            "Ingestion In Progress" | "IngestionInProgress" => Self::IngestionInProgress,
            "Ingested" => Self::Ingested,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Ignored" => Self::Ignored,
            "Duplicate" => Self::Duplicate,
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

text_column!(FileStatus);

/// Position of a file within its current status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileStage {
    DocReady,
    Classified,
    ExtractReady,
    ExtractReceived,
    ManualLink,
    AccountIdentification,
    Approved,
    IngestionInProgress,
    Completed,
    Ignored,
    NotMatchRule,
    Manual,
    Unrecognized(String),
}

impl FileStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DocReady => "DocReady",
            Self::Classified => "Classified",
            Self::ExtractReady => "ExtractReady",
            Self::ExtractReceived => "ExtractReceived",
            Self::ManualLink => "ManualLink",
            Self::AccountIdentification => "AccountIdentification",
            Self::Approved => "Approved",
            Self::IngestionInProgress => "Ingestion In Progress",
            Self::Completed => "Completed",
            Self::Ignored => "Ignored",
            Self::NotMatchRule => "NotMatchRule",
            Self::Manual => "Manual",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl FromStr for FileStage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DocReady" => Self::DocReady,
            "Classified" => Self::Classified,
            "ExtractReady" => Self::ExtractReady,
            "ExtractReceived" => Self::ExtractReceived,
            "ManualLink" => Self::ManualLink,
            "AccountIdentification" => Self::AccountIdentification,
            "Approved" => Self::Approved,
            "Ingestion In Progress" | "IngestionInProgress" => Self::IngestionInProgress,
            "Completed" => Self::Completed,
            "Ignored" => Self::Ignored,
            // Older rows carry the misspelt form.
            "NotMatchRule" | "NotMacthRule" => Self::NotMatchRule,
            "Manual" => Self::Manual,
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

text_column!(FileStage);

/// Where in the pipeline a failed file broke.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureStage {
    FailedCapture,
    FailedExtraction,
    FailedLinking,
    FailedIngestion,
    Unrecognized(String),
}

impl FailureStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::FailedCapture => "Failed Capture",
            Self::FailedExtraction => "Failed Extraction",
            Self::FailedLinking => "Failed Linking",
            Self::FailedIngestion => "Failed Ingestion",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl FromStr for FailureStage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Failed Capture" | "FailedCapture" => Self::FailedCapture,
            "Failed Extraction" | "FailedExtraction" => Self::FailedExtraction,
            "Failed Linking" | "FailedLinking" => Self::FailedLinking,
            "Failed Ingestion" | "FailedIngestion" => Self::FailedIngestion,
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

text_column!(FailureStage);

/// `file_process_stage` value stamped by the rule engine.
pub const RULE_PROCESSOR: &str = "RuleProcessor";

/// `file_process_stage` value stamped by user-driven actions.
pub const MANUAL_PROCESS: &str = "Manual";

/// Actor recorded for engine-driven ignores.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Rule-driven classification for files no rule recognised.
pub const UNKNOWN_CLASSIFICATION: &str = "Unknown";

// -- File record --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub file_uid: Uuid,
    pub file_name: String,
    pub file_type: Option<String>,
    pub harvest_source: Option<String>,
    pub metadata: Option<String>,
    pub checksum: Option<String>,
    pub file_path: Option<String>,
    pub file_extension: Option<String>,
    pub status: FileStatus,
    pub stage: FileStage,
    pub failure_stage: Option<FailureStage>,
    pub file_process_stage: Option<String>,
    pub rule_classification: Option<String>,
    pub ai_classification: Option<String>,
    pub reason: Option<String>,
    pub status_comment: Option<String>,
    pub comments: Option<String>,
    pub replay: bool,
    pub retry_count: i32,
    pub applied_rule: Option<String>,
    pub business_rule_applied_at: Option<DateTime<Utc>>,
    pub ignored_by: Option<String>,
    pub ignored_on: Option<DateTime<Utc>>,
    pub age: Option<i32>,
    pub update_file_uid: Option<Uuid>,
    pub duplicate_file_uid: Option<Uuid>,
    pub status_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl FileRecord {
    /// Files harvested from a mailbox are matched on every email field.
    pub fn is_email_source(&self) -> bool {
        self.harvest_source
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("email"))
    }

    /// Parse the stored metadata JSON. A missing column parses as empty metadata.
    pub fn parsed_metadata(&self) -> Result<FileMetadata, serde_json::Error> {
        match self.metadata.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw),
            _ => Ok(FileMetadata::default()),
        }
    }

    /// Set (status, stage) and stamp the status timestamp.
    pub fn move_to(&mut self, status: FileStatus, stage: FileStage, at: DateTime<Utc>) {
        if self.status != status {
            self.status_date = Some(at);
        }
        self.status = status;
        self.stage = stage;
        self.updated_at = at;
    }
}

/// Harvested metadata attached to a file.
///
/// Email harvesting writes `Subject`, `To`, `Email_Body` and `File_Name`;
/// the alternative key spellings are accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(rename = "Subject", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(
        rename = "To",
        alias = "SenderAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_address: Option<String>,
    #[serde(
        rename = "Email_Body",
        alias = "EmailBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub email_body: Option<String>,
    #[serde(
        rename = "File_Name",
        alias = "FileName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub file_name: Option<String>,
}

/// Values needed to persist a freshly captured file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_uid: Uuid,
    pub file_name: String,
    pub file_extension: Option<String>,
    pub harvest_source: String,
    pub metadata: String,
    pub checksum: String,
    pub file_path: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
