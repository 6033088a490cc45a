//! Per-classification configuration: SLA threshold and priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileConfiguration {
    pub id: i64,
    pub configuration_name: String,
    pub description: Option<String>,
    pub sla_days: Option<i32>,
    pub sla_priority: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertFileConfiguration {
    #[validate(length(min = 1, message = "configuration_name is required"))]
    pub configuration_name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "sla_days cannot be negative"))]
    pub sla_days: Option<i32>,
    pub sla_priority: Option<String>,
    pub is_active: Option<bool>,
}
