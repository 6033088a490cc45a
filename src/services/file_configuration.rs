//! File configuration maintenance.

use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::file_configuration::{FileConfiguration, UpsertFileConfiguration};

pub async fn list(pool: &PgPool) -> Result<Vec<FileConfiguration>, AppError> {
    let mut conn = pool.acquire().await?;
    db::file_configurations::list(&mut conn).await
}

/// Create or replace the configuration named in the request.
pub async fn upsert(
    pool: &PgPool,
    req: &UpsertFileConfiguration,
) -> Result<FileConfiguration, AppError> {
    if req.configuration_name.trim().is_empty() {
        return Err(AppError::Validation(
            "configuration_name is required".to_string(),
        ));
    }
    let mut conn = pool.acquire().await?;
    let row = db::file_configurations::upsert(&mut conn, req).await?;
    tracing::info!(
        configuration = %row.configuration_name,
        sla_days = ?row.sla_days,
        "File configuration saved"
    );
    Ok(row)
}
