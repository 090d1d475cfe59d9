pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod views;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use db::store::PgStore;
use services::session::RedisDraftStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    /// Id of the seeded user every request acts as.
    pub test_user_id: i64,
}

impl AppState {
    pub fn store(&self) -> PgStore {
        PgStore::new(self.db.clone())
    }

    pub fn drafts(&self) -> RedisDraftStore {
        RedisDraftStore::new(self.redis.clone(), self.config.session_ttl_seconds)
    }
}
