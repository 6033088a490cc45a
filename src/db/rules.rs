//! Business rule and rule log queries.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::rule::{BusinessRule, ChangeType, RuleLog, RuleType};

/// Column values for a new rule row.
#[derive(Debug, Clone)]
pub struct RuleRow<'a> {
    pub unique_rule_id: &'a str,
    pub rule_type: RuleType,
    pub rule_expressions: &'a str,
    pub classification: Option<&'a str>,
    pub password: Option<&'a str>,
    pub group_code: Option<&'a str>,
    pub actor: &'a str,
    pub at: DateTime<Utc>,
}

/// Column values for a rule log row.
#[derive(Debug, Clone)]
pub struct RuleLogRow<'a> {
    pub unique_rule_id: &'a str,
    pub change_type: ChangeType,
    pub rule_expressions: &'a str,
    pub title: &'a str,
    pub message: Option<&'a str>,
    pub actor: &'a str,
    pub at: DateTime<Utc>,
}

/// Active rules of one type in ascending id order, the order the matcher honours.
pub async fn list_active_by_type(
    conn: &mut PgConnection,
    rule_type: RuleType,
) -> Result<Vec<BusinessRule>, AppError> {
    let rules = sqlx::query_as::<_, BusinessRule>(
        "SELECT * FROM business_rules WHERE rule_type = $1 AND is_active ORDER BY id ASC",
    )
    .bind(rule_type)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rules)
}

pub async fn list_by_type(
    conn: &mut PgConnection,
    rule_type: Option<RuleType>,
) -> Result<Vec<BusinessRule>, AppError> {
    let rules = sqlx::query_as::<_, BusinessRule>(
        r#"
        SELECT * FROM business_rules
        WHERE ($1::text IS NULL OR rule_type = $1)
        ORDER BY id ASC
        "#,
    )
    .bind(rule_type)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rules)
}

pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<BusinessRule, AppError> {
    sqlx::query_as::<_, BusinessRule>("SELECT * FROM business_rules WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rule {id} not found")))
}

/// Every rule code starting with `prefix`, clones included.
pub async fn codes_with_prefix(
    conn: &mut PgConnection,
    prefix: &str,
) -> Result<Vec<String>, AppError> {
    let codes = sqlx::query_scalar::<_, String>(
        "SELECT unique_rule_id FROM business_rules WHERE unique_rule_id LIKE $1 || '%'",
    )
    .bind(prefix)
    .fetch_all(&mut *conn)
    .await?;
    Ok(codes)
}

/// Serialise code allocation between concurrent writers until commit.
pub async fn lock_for_code_allocation(conn: &mut PgConnection) -> Result<(), AppError> {
    sqlx::query("LOCK TABLE business_rules IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert(conn: &mut PgConnection, row: &RuleRow<'_>) -> Result<BusinessRule, AppError> {
    let rule = sqlx::query_as::<_, BusinessRule>(
        r#"
        INSERT INTO business_rules (
            unique_rule_id, rule_type, rule_expressions, classification, password,
            group_code, created_at, created_by, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7)
        RETURNING *
        "#,
    )
    .bind(row.unique_rule_id)
    .bind(row.rule_type)
    .bind(row.rule_expressions)
    .bind(row.classification)
    .bind(row.password)
    .bind(row.group_code)
    .bind(row.at)
    .bind(row.actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict(format!("Rule code {} already exists", row.unique_rule_id))
        }
        other => AppError::Database(other),
    })?;
    Ok(rule)
}

pub async fn update_definition(
    conn: &mut PgConnection,
    id: i64,
    row: &RuleRow<'_>,
) -> Result<BusinessRule, AppError> {
    sqlx::query_as::<_, BusinessRule>(
        r#"
        UPDATE business_rules SET
            rule_expressions = $2,
            classification = $3,
            password = $4,
            group_code = $5,
            updated_at = $6,
            updated_by = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(row.rule_expressions)
    .bind(row.classification)
    .bind(row.password)
    .bind(row.group_code)
    .bind(row.at)
    .bind(row.actor)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Rule {id} not found")))
}

pub async fn set_active(
    conn: &mut PgConnection,
    id: i64,
    is_active: bool,
    reason: Option<&str>,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<BusinessRule, AppError> {
    sqlx::query_as::<_, BusinessRule>(
        r#"
        UPDATE business_rules SET
            is_active = $2,
            reason_for_toggle = $3,
            updated_at = $4,
            updated_by = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(is_active)
    .bind(reason)
    .bind(at)
    .bind(actor)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Rule {id} not found")))
}

pub async fn insert_log(conn: &mut PgConnection, row: &RuleLogRow<'_>) -> Result<RuleLog, AppError> {
    let log = sqlx::query_as::<_, RuleLog>(
        r#"
        INSERT INTO business_rule_logs (
            unique_rule_id, change_type, rule_expressions, rule_log_title,
            rule_log_message, created_at, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(row.unique_rule_id)
    .bind(row.change_type)
    .bind(row.rule_expressions)
    .bind(row.title)
    .bind(row.message)
    .bind(row.at)
    .bind(row.actor)
    .fetch_one(&mut *conn)
    .await?;
    Ok(log)
}

/// Change history of one rule code, newest first.
pub async fn list_logs(
    conn: &mut PgConnection,
    unique_rule_id: &str,
) -> Result<Vec<RuleLog>, AppError> {
    let logs = sqlx::query_as::<_, RuleLog>(
        r#"
        SELECT * FROM business_rule_logs
        WHERE unique_rule_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(unique_rule_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(logs)
}
