//! File configuration queries.

use std::collections::HashMap;

use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::file_configuration::{FileConfiguration, UpsertFileConfiguration};

/// SLA days keyed by configuration name. A missing threshold reads as 0.
pub async fn sla_map(conn: &mut PgConnection) -> Result<HashMap<String, i32>, AppError> {
    let rows = sqlx::query_as::<_, (String, Option<i32>)>(
        "SELECT configuration_name, sla_days FROM file_configurations WHERE is_active",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, days)| (name, days.unwrap_or(0)))
        .collect())
}

pub async fn list(conn: &mut PgConnection) -> Result<Vec<FileConfiguration>, AppError> {
    let rows = sqlx::query_as::<_, FileConfiguration>(
        "SELECT * FROM file_configurations ORDER BY configuration_name ASC",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn upsert(
    conn: &mut PgConnection,
    req: &UpsertFileConfiguration,
) -> Result<FileConfiguration, AppError> {
    let row = sqlx::query_as::<_, FileConfiguration>(
        r#"
        INSERT INTO file_configurations (configuration_name, description, sla_days, sla_priority, is_active)
        VALUES ($1, $2, $3, $4, COALESCE($5, TRUE))
        ON CONFLICT (configuration_name) DO UPDATE SET
            description = EXCLUDED.description,
            sla_days = EXCLUDED.sla_days,
            sla_priority = EXCLUDED.sla_priority,
            is_active = COALESCE($5, file_configurations.is_active),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(req.configuration_name.trim())
    .bind(&req.description)
    .bind(req.sla_days)
    .bind(&req.sla_priority)
    .bind(req.is_active)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}
