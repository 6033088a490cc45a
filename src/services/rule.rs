//! Business rule administration: create, clone, edit, enable/disable.
//!
//! Rule codes are `{prefix}{nnnn}` where the prefix comes from the rule type
//! and the number is one past the highest code of that prefix. Clones are
//! named `{original}-CLONE{nnnn}` from a separate per-prefix sequence. Every
//! change appends a row to the rule log.

use std::collections::BTreeMap;

use chrono::Utc;
use regex::Regex;
use sqlx::PgPool;

use crate::db;
use crate::db::rules::{RuleLogRow, RuleRow};
use crate::errors::AppError;
use crate::models::rule::{
    BusinessRule, ChangeType, CloneRule, CreateRule, RuleExpression, RuleLog, RuleType,
    ToggleRule, UpdateRule,
};

pub const TITLE_CREATED: &str = "New Rule Created";
pub const TITLE_MODIFIED: &str = "Rule Modified";
pub const TITLE_ENABLED: &str = "Rule Enabled";
pub const TITLE_DISABLED: &str = "Rule Disabled";

const CLONE_MARKER: &str = "-CLONE";

/// Next sequential code for `prefix`, ignoring clones.
pub fn next_rule_code(prefix: &str, existing: &[String]) -> String {
    let highest = existing
        .iter()
        .filter(|code| !code.contains(CLONE_MARKER))
        .filter_map(|code| code.strip_prefix(prefix))
        .filter_map(|digits| digits.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:04}", highest + 1)
}

/// Next clone code for `original`, numbered from the clones of `prefix`.
///
/// A clone of a clone is numbered from the base code: `CN0001-CLONE0001`
/// clones to `CN0001-CLONE0002`.
pub fn next_clone_code(original: &str, prefix: &str, existing: &[String]) -> String {
    let clone_suffix = Regex::new(r"CLONE(\d+)$").ok();
    let highest = existing
        .iter()
        .filter(|code| code.starts_with(prefix) && code.contains(CLONE_MARKER))
        .filter_map(|code| {
            clone_suffix
                .as_ref()?
                .captures(code)?
                .get(1)?
                .as_str()
                .parse::<u32>()
                .ok()
        })
        .max()
        .unwrap_or(0);
    let base = original.split(CLONE_MARKER).next().unwrap_or(original);
    format!("{base}{CLONE_MARKER}{:04}", highest + 1)
}

fn keyed(expression: &RuleExpression) -> BTreeMap<&'static str, &str> {
    [
        ("Subject", expression.subject.as_deref()),
        ("SenderAddress", expression.sender_address.as_deref()),
        ("EmailBody", expression.email_body.as_deref()),
        ("FileName", expression.file_name.as_deref()),
    ]
    .into_iter()
    .map(|(key, value)| (key, value.unwrap_or("")))
    .collect()
}

/// JSON summary of what changed between two rule expressions.
pub fn rule_change_message(old: &RuleExpression, new: &RuleExpression) -> String {
    let (old, new) = (keyed(old), keyed(new));
    let mut modified = Vec::new();
    let mut added = Vec::new();

    for (key, new_value) in &new {
        let old_value = old.get(key).copied().unwrap_or("");
        if old_value == *new_value {
            continue;
        }
        let line = format!("{key} : {new_value}");
        if old_value.is_empty() {
            added.push(line);
        } else {
            modified.push(line);
        }
    }

    let mut summary = serde_json::Map::new();
    if !modified.is_empty() {
        let label = if modified.len() > 1 { "Patterns Modified" } else { "Pattern Modified" };
        summary.insert(label.to_string(), modified.into());
    }
    if !added.is_empty() {
        let label = if added.len() > 1 { "Patterns Added" } else { "Pattern Added" };
        summary.insert(label.to_string(), added.into());
    }
    serde_json::Value::Object(summary).to_string()
}

fn validate_definition(
    rule_type: RuleType,
    expression: &RuleExpression,
    classification: Option<&str>,
) -> Result<(), AppError> {
    if expression.is_empty() {
        return Err(AppError::Validation(
            "Rule needs at least one pattern".to_string(),
        ));
    }
    if rule_type == RuleType::Classification
        && classification.map_or(true, |c| c.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Classification rules need a target classification".to_string(),
        ));
    }
    Ok(())
}

fn to_json(expression: &RuleExpression) -> Result<String, AppError> {
    serde_json::to_string(expression).map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn list(pool: &PgPool, rule_type: Option<RuleType>) -> Result<Vec<BusinessRule>, AppError> {
    let mut conn = pool.acquire().await?;
    db::rules::list_by_type(&mut conn, rule_type).await
}

pub async fn logs(pool: &PgPool, unique_rule_id: &str) -> Result<Vec<RuleLog>, AppError> {
    let mut conn = pool.acquire().await?;
    db::rules::list_logs(&mut conn, unique_rule_id).await
}

pub async fn create(pool: &PgPool, req: &CreateRule) -> Result<BusinessRule, AppError> {
    validate_definition(req.rule_type, &req.rule_expressions, req.classification.as_deref())?;
    let expressions = to_json(&req.rule_expressions)?;
    let at = Utc::now();

    let mut tx = pool.begin().await?;
    db::rules::lock_for_code_allocation(&mut *tx).await?;
    let prefix = req.rule_type.code_prefix();
    let codes = db::rules::codes_with_prefix(&mut *tx, prefix).await?;
    let code = next_rule_code(prefix, &codes);

    let rule = db::rules::insert(
        &mut *tx,
        &RuleRow {
            unique_rule_id: &code,
            rule_type: req.rule_type,
            rule_expressions: &expressions,
            classification: req.classification.as_deref(),
            password: req.password.as_deref(),
            group_code: req.group_code.as_deref(),
            actor: &req.created_by,
            at,
        },
    )
    .await?;

    db::rules::insert_log(
        &mut *tx,
        &RuleLogRow {
            unique_rule_id: &code,
            change_type: ChangeType::Added,
            rule_expressions: &expressions,
            title: TITLE_CREATED,
            message: None,
            actor: &req.created_by,
            at,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(rule = %code, rule_type = %req.rule_type, "Rule created");
    Ok(rule)
}

pub async fn clone_rule(pool: &PgPool, id: i64, req: &CloneRule) -> Result<BusinessRule, AppError> {
    let at = Utc::now();
    let mut tx = pool.begin().await?;
    db::rules::lock_for_code_allocation(&mut *tx).await?;
    let original = db::rules::find_by_id(&mut *tx, id).await?;
    let prefix = original.rule_type.code_prefix();
    let codes = db::rules::codes_with_prefix(&mut *tx, prefix).await?;
    let code = next_clone_code(&original.unique_rule_id, prefix, &codes);

    let rule = db::rules::insert(
        &mut *tx,
        &RuleRow {
            unique_rule_id: &code,
            rule_type: original.rule_type,
            rule_expressions: &original.rule_expressions,
            classification: original.classification.as_deref(),
            password: original.password.as_deref(),
            group_code: original.group_code.as_deref(),
            actor: &req.created_by,
            at,
        },
    )
    .await?;

    let message = format!("Cloned from {}", original.unique_rule_id);
    db::rules::insert_log(
        &mut *tx,
        &RuleLogRow {
            unique_rule_id: &code,
            change_type: ChangeType::Added,
            rule_expressions: &original.rule_expressions,
            title: TITLE_CREATED,
            message: Some(&message),
            actor: &req.created_by,
            at,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(rule = %code, original = %original.unique_rule_id, "Rule cloned");
    Ok(rule)
}

pub async fn update(pool: &PgPool, id: i64, req: &UpdateRule) -> Result<BusinessRule, AppError> {
    let at = Utc::now();
    let mut tx = pool.begin().await?;
    let current = db::rules::find_by_id(&mut *tx, id).await?;
    validate_definition(current.rule_type, &req.rule_expressions, req.classification.as_deref())?;

    let previous: RuleExpression =
        serde_json::from_str(&current.rule_expressions).unwrap_or_else(|e| {
            tracing::warn!(rule = %current.unique_rule_id, error = %e, "Stored rule expression is not valid JSON");
            RuleExpression::default()
        });
    let message = rule_change_message(&previous, &req.rule_expressions);
    let expressions = to_json(&req.rule_expressions)?;

    let rule = db::rules::update_definition(
        &mut *tx,
        id,
        &RuleRow {
            unique_rule_id: &current.unique_rule_id,
            rule_type: current.rule_type,
            rule_expressions: &expressions,
            classification: req.classification.as_deref(),
            password: req.password.as_deref(),
            group_code: req.group_code.as_deref(),
            actor: &req.updated_by,
            at,
        },
    )
    .await?;

    db::rules::insert_log(
        &mut *tx,
        &RuleLogRow {
            unique_rule_id: &current.unique_rule_id,
            change_type: ChangeType::Updated,
            rule_expressions: &expressions,
            title: TITLE_MODIFIED,
            message: Some(&message),
            actor: &req.updated_by,
            at,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(rule = %rule.unique_rule_id, "Rule updated");
    Ok(rule)
}

pub async fn toggle(pool: &PgPool, id: i64, req: &ToggleRule) -> Result<BusinessRule, AppError> {
    let at = Utc::now();
    let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let mut tx = pool.begin().await?;
    let rule = db::rules::set_active(&mut *tx, id, req.is_active, reason, &req.updated_by, at).await?;

    let (title, state) = if req.is_active {
        (TITLE_ENABLED, "enabled")
    } else {
        (TITLE_DISABLED, "disabled")
    };
    let message = match reason {
        Some(r) => format!("The Rule is {state}: {r}"),
        None => format!("The Rule is {state}"),
    };
    db::rules::insert_log(
        &mut *tx,
        &RuleLogRow {
            unique_rule_id: &rule.unique_rule_id,
            change_type: ChangeType::Updated,
            rule_expressions: &rule.rule_expressions,
            title,
            message: Some(&message),
            actor: &req.updated_by,
            at,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(rule = %rule.unique_rule_id, is_active = req.is_active, "Rule toggled");
    Ok(rule)
}
