use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::{auth::password::CredentialHasher, config::AppConfig, db};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub hasher: Arc<CredentialHasher>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::pool_options(&config.database)
            .connect_with(db::connect_options(&config.database))
            .await
            .context("connect to database")?;

        let hasher = Arc::new(
            CredentialHasher::new(&config.argon2).context("invalid argon2 cost parameters")?,
        );

        Ok(Self::from_parts(db, config, hasher))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, hasher: Arc<CredentialHasher>) -> Self {
        Self { db, config, hasher }
    }

    /// State over a pool that never connects unless a handler reaches the store.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{Argon2Config, DatabaseConfig, SessionConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 5,
            database: DatabaseConfig {
                host: "localhost".into(),
                user: "postgres".into(),
                password: "postgres".into(),
                database: "postgres".into(),
                port: 5432,
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            session: SessionConfig {
                cookie_name: "session".into(),
                secure: false,
            },
            argon2: Argon2Config {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
        });

        let db = db::pool_options(&config.database)
            .connect_lazy_with(db::connect_options(&config.database));
        let hasher = Arc::new(CredentialHasher::new(&config.argon2).expect("test argon2 params"));

        Self::from_parts(db, config, hasher)
    }
}
