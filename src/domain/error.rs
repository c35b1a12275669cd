use thiserror::Error;

use super::todo::TodoId;

/// Boxed source for wrapped storage failures, so the domain contract does
/// not name the database driver.
pub type StoreSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified storage failure. Every variant labels the stage at which a
/// multi-step operation failed; nothing at this layer retries or
/// suppresses an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Establishing the connection failed (auth or network).
    #[error("could not open connection: {0}")]
    Connect(#[source] StoreSource),

    /// A handle was obtained but did not answer the liveness check.
    #[error("could not ping database: {0}")]
    Ping(#[source] StoreSource),

    #[error("schema check failed: {0}")]
    SchemaCheck(#[source] StoreSource),

    #[error("cannot populate schema: {0}")]
    SchemaInit(#[source] StoreSource),

    /// A read statement could not be executed.
    #[error("{op} error: on query: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: StoreSource,
    },

    /// A write statement could not be executed.
    #[error("{op} error: on exec: {source}")]
    Exec {
        op: &'static str,
        #[source]
        source: StoreSource,
    },

    /// A fetched row could not be decoded into a [`Todo`](super::todo::Todo).
    #[error("{op} error: on scan: {source}")]
    Scan {
        op: &'static str,
        #[source]
        source: StoreSource,
    },

    /// No record carries the requested id. Kept distinct so callers can
    /// report a not-found outcome instead of a server error.
    #[error("todo {id} not found")]
    NotFound { id: TodoId },
}

impl StoreError {
    pub fn connect(source: impl Into<StoreSource>) -> Self {
        Self::Connect(source.into())
    }

    pub fn ping(source: impl Into<StoreSource>) -> Self {
        Self::Ping(source.into())
    }

    pub fn schema_check(source: impl Into<StoreSource>) -> Self {
        Self::SchemaCheck(source.into())
    }

    pub fn schema_init(source: impl Into<StoreSource>) -> Self {
        Self::SchemaInit(source.into())
    }

    pub fn query(op: &'static str, source: impl Into<StoreSource>) -> Self {
        Self::Query {
            op,
            source: source.into(),
        }
    }

    pub fn exec(op: &'static str, source: impl Into<StoreSource>) -> Self {
        Self::Exec {
            op,
            source: source.into(),
        }
    }

    pub fn scan(op: &'static str, source: impl Into<StoreSource>) -> Self {
        Self::Scan {
            op,
            source: source.into(),
        }
    }

    pub fn not_found(id: TodoId) -> Self {
        Self::NotFound { id }
    }

    /// True for the dedicated absent-record signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
