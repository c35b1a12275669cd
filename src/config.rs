use anyhow::Context;

/// Database connection settings, one field per input the storage layer
/// takes. `password` may be empty; its presence is what selects the
/// authentication mode, so no separate mode flag exists.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub name: String,
    /// Connection target for identity-based dialing: a Cloud SQL instance
    /// connection name, or an absolute auth-proxy socket path.
    pub conn: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub port: u16,
}

impl Config {
    /// Reads the environment variables the service has always used:
    /// `db_user`, `db_pass`, `db_host`, `db_name`, `db_conn`, `PORT`.
    /// Unset database variables come back as empty strings; an unset
    /// `PORT` defaults to 8080.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            db: DbConfig {
                user: env_or_empty("db_user"),
                password: env_or_empty("db_pass"),
                host: env_or_empty("db_host"),
                name: env_or_empty("db_name"),
                conn: env_or_empty("db_conn"),
            },
            port,
        })
    }
}

fn env_or_empty(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}
