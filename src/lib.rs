pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;

use sqlx::PgPool;

use services::storage::ContentStore;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::AppConfig,
    pub store: ContentStore,
}

impl AppState {
    pub fn new(db: PgPool, config: config::AppConfig) -> Self {
        let store = ContentStore::new(&config.storage_root);
        Self { db, config, store }
    }
}
