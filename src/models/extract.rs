//! Extract records: accounts identified inside a file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExtractFile {
    pub id: i64,
    pub file_uid: Uuid,
    pub account: Option<String>,
    pub account_uid: Option<String>,
    /// Account identifier checked for uniqueness at approval.
    pub account_sid: Option<String>,
    pub business_date: Option<NaiveDate>,
    pub is_linked: bool,
    pub is_ignored: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
