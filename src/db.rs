use std::time::Duration;

use serde_json::Value;
use sqlx::{
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
    PgConnection, PgPool, Postgres,
};
use tracing::debug;

use crate::{config::DatabaseConfig, query::ComposedQuery};

pub fn connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.database)
}

pub fn pool_options(cfg: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
}

/// Check out one connection for the current request; it goes back to the
/// pool when the guard drops.
pub async fn acquire(pool: &PgPool) -> Result<PoolConnection<Postgres>, sqlx::Error> {
    let conn = pool.acquire().await?;
    debug!(idle = pool.num_idle(), size = pool.size(), "connection acquired");
    Ok(conn)
}

pub async fn execute(conn: &mut PgConnection, query: &ComposedQuery) -> Result<u64, sqlx::Error> {
    let done = sqlx::query_with(&query.sql, query.arguments())
        .execute(conn)
        .await?;
    Ok(done.rows_affected())
}

/// Rows are selected as a single JSON column and forwarded untouched.
pub async fn fetch_one(
    conn: &mut PgConnection,
    query: &ComposedQuery,
) -> Result<Option<Value>, sqlx::Error> {
    sqlx::query_scalar_with::<_, Value, _>(&query.sql, query.arguments())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_all(
    conn: &mut PgConnection,
    query: &ComposedQuery,
) -> Result<Vec<Value>, sqlx::Error> {
    sqlx::query_scalar_with::<_, Value, _>(&query.sql, query.arguments())
        .fetch_all(conn)
        .await
}
