//! Extract record queries.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::extract::ExtractFile;

pub async fn list_for_file(
    conn: &mut PgConnection,
    file_uid: Uuid,
) -> Result<Vec<ExtractFile>, AppError> {
    let rows = sqlx::query_as::<_, ExtractFile>(
        "SELECT * FROM extract_files WHERE file_uid = $1 AND is_active ORDER BY id ASC",
    )
    .bind(file_uid)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
