//! Database connection pool, migrations and the repository functions.
//!
//! Repository functions take `&mut PgConnection` so the same call works on a
//! pooled connection or inside a transaction (`&mut *tx`).

pub mod audit;
pub mod extracts;
pub mod file_configurations;
pub mod files;
pub mod rules;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
