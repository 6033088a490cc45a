//! Process log and activity queries.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::audit::{Activity, NewActivity, NewProcessLog, ProcessLog};

pub async fn insert_process_log(
    conn: &mut PgConnection,
    row: &NewProcessLog,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO file_process_logs (
            file_uid, status, stage, classification, rule_id, status_comment,
            file_process_stage, created_at, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(row.file_uid)
    .bind(&row.status)
    .bind(&row.stage)
    .bind(&row.classification)
    .bind(&row.rule_id)
    .bind(&row.status_comment)
    .bind(&row.file_process_stage)
    .bind(row.created_at)
    .bind(&row.created_by)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_activity(conn: &mut PgConnection, row: &NewActivity) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO file_activities (
            file_uid, status, stage, failure_stage, file_process_stage,
            status_comment, comment, is_commented, created_at, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(row.file_uid)
    .bind(&row.status)
    .bind(&row.stage)
    .bind(&row.failure_stage)
    .bind(&row.file_process_stage)
    .bind(&row.status_comment)
    .bind(&row.comment)
    .bind(row.is_commented)
    .bind(row.created_at)
    .bind(&row.created_by)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Active activity rows of a file, newest first.
pub async fn list_activities(
    conn: &mut PgConnection,
    file_uid: Uuid,
) -> Result<Vec<Activity>, AppError> {
    let rows = sqlx::query_as::<_, Activity>(
        r#"
        SELECT * FROM file_activities
        WHERE file_uid = $1 AND is_active
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(file_uid)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Active process log rows of a file, newest first.
pub async fn list_process_logs(
    conn: &mut PgConnection,
    file_uid: Uuid,
) -> Result<Vec<ProcessLog>, AppError> {
    let rows = sqlx::query_as::<_, ProcessLog>(
        r#"
        SELECT * FROM file_process_logs
        WHERE file_uid = $1 AND is_active
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(file_uid)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
