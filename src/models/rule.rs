//! Business rule model, pattern expressions and the rule change log.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    Classification,
    Ignore,
    Password,
    Etl,
}

impl RuleType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Classification => "Classification",
            Self::Ignore => "Ignore",
            Self::Password => "Password",
            Self::Etl => "ETL",
        }
    }

    /// Prefix of every rule code of this type.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Self::Classification => "CN",
            Self::Ignore => "IG",
            Self::Password => "PW",
            Self::Etl => "ETL",
        }
    }
}

impl FromStr for RuleType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Classification" => Ok(Self::Classification),
            "Ignore" => Ok(Self::Ignore),
            "Password" => Ok(Self::Password),
            "ETL" => Ok(Self::Etl),
            other => Err(ParseEnumError {
                kind: "rule type",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(RuleType);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Updated,
}

impl ChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Added => "Added",
            Self::Updated => "Updated",
        }
    }
}

impl FromStr for ChangeType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Added" => Ok(Self::Added),
            "Updated" => Ok(Self::Updated),
            other => Err(ParseEnumError {
                kind: "change type",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(ChangeType);

/// Wildcard patterns of a rule, keyed by the metadata field they target.
///
/// Email rules may populate any key; rules for other sources use `FileName` only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleExpression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl RuleExpression {
    /// Populated patterns in evaluation order, with their key names.
    pub fn patterns(&self) -> Vec<(&'static str, &str)> {
        [
            ("Subject", &self.subject),
            ("SenderAddress", &self.sender_address),
            ("EmailBody", &self.email_body),
            ("FileName", &self.file_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessRule {
    pub id: i64,
    pub unique_rule_id: String,
    pub rule_type: RuleType,
    /// JSON text of a [`RuleExpression`]. Parsed leniently at match time.
    pub rule_expressions: String,
    pub classification: Option<String>,
    pub password: Option<String>,
    pub group_code: Option<String>,
    pub reason_for_toggle: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// Append-only history of rule changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleLog {
    pub id: i64,
    pub unique_rule_id: String,
    pub change_type: ChangeType,
    pub rule_expressions: String,
    pub rule_log_title: String,
    pub rule_log_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

// -- DTOs --

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRule {
    pub rule_type: RuleType,
    pub rule_expressions: RuleExpression,
    pub classification: Option<String>,
    pub password: Option<String>,
    pub group_code: Option<String>,
    #[validate(length(min = 1, message = "created_by is required"))]
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRule {
    pub rule_expressions: RuleExpression,
    pub classification: Option<String>,
    pub password: Option<String>,
    pub group_code: Option<String>,
    #[validate(length(min = 1, message = "updated_by is required"))]
    pub updated_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ToggleRule {
    pub is_active: bool,
    pub reason: Option<String>,
    #[validate(length(min = 1, message = "updated_by is required"))]
    pub updated_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CloneRule {
    #[validate(length(min = 1, message = "created_by is required"))]
    pub created_by: String,
}
