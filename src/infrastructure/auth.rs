//! Connection authentication modes.
//!
//! Exactly one of two modes applies, selected by the presence of a
//! password rather than by a caller-supplied flag. An empty password
//! means the service authenticates through its ambient service-account
//! identity over the Cloud SQL auth-proxy socket; a non-empty password
//! means a direct username/password dial over TCP. Both shapes disable
//! TLS; the service assumes trusted private-network deployments and
//! host-local proxy sockets.

use std::path::{Path, PathBuf};

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::config::DbConfig;

/// Port used for direct username/password connections.
pub const POSTGRES_PORT: u16 = 5432;

/// Domain suffix stripped from service-account users before dialing.
const SERVICE_ACCOUNT_SUFFIX: &str = ".gserviceaccount.com";

/// Directory the Cloud SQL auth proxy publishes instance sockets under.
const CLOUDSQL_SOCKET_DIR: &str = "/cloudsql";

/// How the database connection authenticates. Built exactly once from the
/// configured credentials; no other code path re-decides the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Identity-based: dial the auth-proxy socket for the configured
    /// instance as the normalized service-account user. Carries no
    /// password.
    ServiceAccount { user: String },
    /// Direct: host, port, user and password over TCP.
    Password {
        user: String,
        password: String,
        port: u16,
    },
}

impl AuthMethod {
    /// Selects the mode from credential presence: an empty password means
    /// service-account identity (with any `.gserviceaccount.com` suffix
    /// stripped from the user), anything else means a direct dial on the
    /// literal Postgres port.
    pub fn from_credentials(user: &str, password: &str) -> Self {
        if password.is_empty() {
            Self::ServiceAccount {
                user: user.replace(SERVICE_ACCOUNT_SUFFIX, ""),
            }
        } else {
            Self::Password {
                user: user.to_owned(),
                password: password.to_owned(),
                port: POSTGRES_PORT,
            }
        }
    }

    /// Label used in startup logs.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ServiceAccount { .. } => "service account",
            Self::Password { .. } => "database user",
        }
    }

    /// Renders the mode into connect options against the configured
    /// target database.
    pub fn connect_options(&self, cfg: &DbConfig) -> PgConnectOptions {
        match self {
            Self::ServiceAccount { user } => PgConnectOptions::new()
                .socket(instance_socket(&cfg.conn))
                .username(user)
                .database(&cfg.name)
                .ssl_mode(PgSslMode::Disable),
            Self::Password {
                user,
                password,
                port,
            } => PgConnectOptions::new()
                .host(&cfg.host)
                .port(*port)
                .username(user)
                .password(password)
                .database(&cfg.name)
                .ssl_mode(PgSslMode::Disable),
        }
    }
}

/// Maps a connection target to the auth-proxy socket directory: absolute
/// paths pass through, instance connection names land under `/cloudsql`.
fn instance_socket(target: &str) -> PathBuf {
    if target.starts_with('/') {
        PathBuf::from(target)
    } else {
        Path::new(CLOUDSQL_SOCKET_DIR).join(target)
    }
}
