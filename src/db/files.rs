//! File record queries.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::file::{FileRecord, FileStage, FileStatus, NewFile};

pub async fn find_by_uid(
    conn: &mut PgConnection,
    file_uid: Uuid,
) -> Result<Option<FileRecord>, AppError> {
    let file = sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE file_uid = $1 AND is_active",
    )
    .bind(file_uid)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(file)
}

/// Load and row-lock a file for the rest of the transaction.
pub async fn lock_by_uid(conn: &mut PgConnection, file_uid: Uuid) -> Result<FileRecord, AppError> {
    sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE file_uid = $1 AND is_active FOR UPDATE",
    )
    .bind(file_uid)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("File {file_uid} not found")))
}

/// Active files sitting at `stage`, oldest first, locked for the transaction.
pub async fn find_at_stage(
    conn: &mut PgConnection,
    stage: &FileStage,
) -> Result<Vec<FileRecord>, AppError> {
    let files = sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE stage = $1 AND is_active ORDER BY id ASC FOR UPDATE",
    )
    .bind(stage)
    .fetch_all(&mut *conn)
    .await?;
    Ok(files)
}

pub async fn find_by_checksum(
    conn: &mut PgConnection,
    checksum: &str,
) -> Result<Option<FileRecord>, AppError> {
    let file = sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE checksum = $1 AND is_active ORDER BY id ASC LIMIT 1",
    )
    .bind(checksum)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(file)
}

/// Persist a newly captured file at (Captured, DocReady).
pub async fn insert(conn: &mut PgConnection, new: &NewFile) -> Result<FileRecord, AppError> {
    let file = sqlx::query_as::<_, FileRecord>(
        r#"
        INSERT INTO files (
            file_uid, file_name, harvest_source, metadata, checksum, file_path,
            file_extension, status, stage, status_date, created_at, created_by, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $10)
        RETURNING *
        "#,
    )
    .bind(new.file_uid)
    .bind(&new.file_name)
    .bind(&new.harvest_source)
    .bind(&new.metadata)
    .bind(&new.checksum)
    .bind(&new.file_path)
    .bind(&new.file_extension)
    .bind(FileStatus::Captured)
    .bind(FileStage::DocReady)
    .bind(new.created_at)
    .bind(&new.created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(file)
}

/// Write every mutable lifecycle column of `file` back to its row.
pub async fn save_state(conn: &mut PgConnection, file: &FileRecord) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE files SET
            file_type = $2,
            status = $3,
            stage = $4,
            failure_stage = $5,
            file_process_stage = $6,
            rule_classification = $7,
            ai_classification = $8,
            reason = $9,
            status_comment = $10,
            comments = $11,
            replay = $12,
            retry_count = $13,
            applied_rule = $14,
            business_rule_applied_at = $15,
            ignored_by = $16,
            ignored_on = $17,
            age = $18,
            update_file_uid = $19,
            duplicate_file_uid = $20,
            status_date = $21,
            updated_at = $22,
            updated_by = $23
        WHERE file_uid = $1
        "#,
    )
    .bind(file.file_uid)
    .bind(&file.file_type)
    .bind(&file.status)
    .bind(&file.stage)
    .bind(&file.failure_stage)
    .bind(&file.file_process_stage)
    .bind(&file.rule_classification)
    .bind(&file.ai_classification)
    .bind(&file.reason)
    .bind(&file.status_comment)
    .bind(&file.comments)
    .bind(file.replay)
    .bind(file.retry_count)
    .bind(&file.applied_rule)
    .bind(file.business_rule_applied_at)
    .bind(&file.ignored_by)
    .bind(file.ignored_on)
    .bind(file.age)
    .bind(file.update_file_uid)
    .bind(file.duplicate_file_uid)
    .bind(file.status_date)
    .bind(file.updated_at)
    .bind(&file.updated_by)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("File {} not found", file.file_uid)));
    }
    Ok(())
}
