pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod workflow;

use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use config::Config;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub redis_client: RedisClient,
    pub config: Arc<Config>,
}
