use std::fmt;

use anyhow::Context;

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub argon2: Argon2Config,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));
        let parsed = |key: &str, default| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let database = DatabaseConfig {
            host: required("PG_HOST")?,
            user: required("PG_USER")?,
            password: required("PG_PASSWORD")?,
            database: required("PG_DATABASE")?,
            port: u16::try_from(parsed("PG_PORT", 5432)?).context("PG_PORT out of range")?,
            max_connections: u32::try_from(parsed("DB_MAX_CONNECTIONS", 10)?)
                .context("DB_MAX_CONNECTIONS out of range")?,
            acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
        };

        let session = SessionConfig {
            cookie_name: lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "session".into()),
            secure: lookup("SESSION_COOKIE_SECURE")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        };

        let defaults = Argon2Config::default();
        let argon2 = Argon2Config {
            memory_kib: u32::try_from(parsed("ARGON2_MEMORY_KIB", defaults.memory_kib.into())?)
                .context("ARGON2_MEMORY_KIB out of range")?,
            iterations: u32::try_from(parsed("ARGON2_ITERATIONS", defaults.iterations.into())?)
                .context("ARGON2_ITERATIONS out of range")?,
            parallelism: u32::try_from(parsed("ARGON2_PARALLELISM", defaults.parallelism.into())?)
                .context("ARGON2_PARALLELISM out of range")?,
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: u16::try_from(parsed("APP_PORT", 8080)?).context("APP_PORT out of range")?,
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", 10)?,
            database,
            session,
            argon2,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("PG_HOST", "db.local"),
        ("PG_USER", "catalog"),
        ("PG_PASSWORD", "hunter2"),
        ("PG_DATABASE", "media"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let cfg = AppConfig::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(cfg.database.port, 5432);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.session.cookie_name, "session");
        assert!(!cfg.session.secure);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.argon2.memory_kib, argon2::Params::DEFAULT_M_COST);
    }

    #[test]
    fn missing_required_var_is_named() {
        let err = AppConfig::from_lookup(lookup_from(&BASE[..3])).unwrap_err();
        assert!(err.to_string().contains("PG_DATABASE"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("PG_PORT", "6543"),
            ("SESSION_COOKIE_SECURE", "true"),
            ("SESSION_COOKIE_NAME", "sid"),
            ("ARGON2_ITERATIONS", "4"),
        ]);
        let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(cfg.database.port, 6543);
        assert!(cfg.session.secure);
        assert_eq!(cfg.session.cookie_name, "sid");
        assert_eq!(cfg.argon2.iterations, 4);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PG_PORT", "not-a-port"));
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn debug_output_hides_database_password() {
        let cfg = AppConfig::from_lookup(lookup_from(BASE)).unwrap();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("hunter2"));
    }
}
