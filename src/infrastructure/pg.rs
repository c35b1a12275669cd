//! Postgres-backed todo storage.
//!
//! A single [`PgPool`] is shared by every request for the lifetime of the
//! process; sqlx pools are safe for concurrent use, so no locking happens
//! at this layer and no operation retries or times out here. The schema
//! bootstrap is the only multi-statement transaction. Its check-then-create
//! sequence is not guarded against a second instance bootstrapping the same
//! database concurrently: the service assumes a single writer at startup.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Connection, PgPool, Row};

use crate::config::DbConfig;
use crate::domain::error::StoreError;
use crate::domain::repository::TodoRepository;
use crate::domain::todo::{CompletionChange, CreateTodo, Todo, TodoId, UpdateTodo};
use crate::infrastructure::auth::AuthMethod;

const MAX_CONNECTIONS: u32 = 5;

/// Catalog probe: any base table outside the system schemas means the
/// schema is already in place. Zero rows is "not present", not an error.
const CHECK_SCHEMA_SQL: &str = "\
SELECT table_schema || '.' || table_name
FROM information_schema.tables
WHERE table_type = 'BASE TABLE'
AND table_schema NOT IN ('pg_catalog', 'information_schema')";

const CREATE_TABLE_SQL: &str = "\
CREATE TABLE todo (
    id SERIAL PRIMARY KEY,
    title varchar(512) DEFAULT NULL,
    updated timestamp DEFAULT NULL,
    completed timestamp DEFAULT NULL)";

const SEED_SQL: &str = "\
INSERT INTO todo (id, title, updated, completed)
VALUES
    (1,'Install and configure todo app','2021-10-28 12:00:00','2021-10-28 12:00:00'),
    (2,'Add your own todo','2021-10-28 12:00:00',NULL),
    (3,'Mark task 1 done','2021-10-27 14:26:00',NULL)";

/// Seeding inserts explicit ids, so the primary-key sequence has to be
/// moved past them or the next insert would collide.
const SYNC_SEQUENCE_SQL: &str =
    "SELECT setval('todo_id_seq', (SELECT MAX(id) FROM todo)+1)";

/// Bootstrap statements, executed in order inside one transaction.
const INIT_STATEMENTS: [&str; 3] = [CREATE_TABLE_SQL, SEED_SQL, SYNC_SEQUENCE_SQL];

const LIST_SQL: &str =
    "SELECT id, title, updated, completed FROM todo ORDER BY updated DESC";

const READ_SQL: &str = "SELECT id, title, updated, completed FROM todo WHERE id = $1";

// Two INSERT shapes: completion requested at creation stamps `completed`
// with the same clock reading as `updated`.
const INSERT_SQL: &str = "\
INSERT INTO todo (title, updated) VALUES ($1, NOW())
RETURNING id, title, updated, completed";

const INSERT_COMPLETE_SQL: &str = "\
INSERT INTO todo (title, updated, completed) VALUES ($1, NOW(), NOW())
RETURNING id, title, updated, completed";

// Three UPDATE shapes, one per completion transition. All of them return
// the stored row; an empty result means the record vanished between the
// prior read and this write.
const UPDATE_SQL: &str = "\
UPDATE todo SET title = $1, updated = NOW()
WHERE id = $2
RETURNING id, title, updated, completed";

const UPDATE_COMPLETE_SQL: &str = "\
UPDATE todo SET title = $1, updated = NOW(), completed = NOW()
WHERE id = $2
RETURNING id, title, updated, completed";

const UPDATE_REOPEN_SQL: &str = "\
UPDATE todo SET title = $1, updated = NOW(), completed = NULL
WHERE id = $2
RETURNING id, title, updated, completed";

const DELETE_SQL: &str = "DELETE FROM todo WHERE id = $1";

/// Shared Postgres handle implementing the todo storage contract.
#[derive(Clone)]
pub struct PgTodoRepository {
    pool: PgPool,
}

impl PgTodoRepository {
    /// Establishes the pooled connection under the mode selected from the
    /// configured credentials, then verifies liveness with a ping. Both
    /// failures are fatal and not retried.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, StoreError> {
        let method = AuthMethod::from_credentials(&cfg.user, &cfg.password);
        tracing::info!(method = method.describe(), "opening connection");

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(method.connect_options(cfg))
            .await
            .map_err(StoreError::connect)?;
        tracing::debug!("connection opened");

        let mut conn = pool.acquire().await.map_err(StoreError::ping)?;
        conn.ping().await.map_err(StoreError::ping)?;
        tracing::debug!("ping complete");

        Ok(Self { pool })
    }

    /// Drains the pool. Called once at shutdown.
    pub async fn close(&self) {
        tracing::debug!("close called on database");
        self.pool.close().await;
    }

    async fn schema_exists(&self) -> Result<bool, StoreError> {
        let row = sqlx::query(CHECK_SCHEMA_SQL)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::schema_check)?;
        Ok(row.is_some())
    }

    async fn schema_init(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::schema_init)?;
        for statement in INIT_STATEMENTS {
            tracing::debug!(statement, "executing schema statement");
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::schema_init)?;
        }
        // Dropping the transaction instead would roll everything back;
        // partial schema states are never observable.
        tx.commit().await.map_err(StoreError::schema_init)
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepository {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        if self.schema_exists().await? {
            tracing::debug!("schema present, skipping init");
            return Ok(());
        }
        tracing::info!("populating schema");
        self.schema_init().await
    }

    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query(LIST_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("list", e))?;
        rows.iter().map(|row| row_to_todo(row, "list")).collect()
    }

    async fn create(&self, input: CreateTodo) -> Result<Todo, StoreError> {
        let sql = if input.complete {
            INSERT_COMPLETE_SQL
        } else {
            INSERT_SQL
        };
        let row = sqlx::query(sql)
            .bind(&input.title)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::exec("create", e))?;
        row_to_todo(&row, "create")
    }

    async fn read(&self, id: TodoId) -> Result<Todo, StoreError> {
        let row = sqlx::query(READ_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("read", e))?;
        match row {
            Some(row) => row_to_todo(&row, "read"),
            None => Err(StoreError::not_found(id)),
        }
    }

    async fn update(&self, input: UpdateTodo) -> Result<Todo, StoreError> {
        // The prior completion state decides the statement shape, so the
        // stored record is read first; a missing record fails here.
        let prior = self.read(input.id).await?;
        let change = CompletionChange::between(prior.is_complete(), input.complete);

        let row = sqlx::query(update_shape(change))
            .bind(&input.title)
            .bind(input.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::exec("update", e))?;
        match row {
            Some(row) => row_to_todo(&row, "update"),
            // Vanished between the read above and this write.
            None => Err(StoreError::not_found(input.id)),
        }
    }

    async fn delete(&self, id: TodoId) -> Result<(), StoreError> {
        // Zero affected rows is fine: deleting an absent id succeeds.
        sqlx::query(DELETE_SQL)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::exec("delete", e))?;
        Ok(())
    }
}

/// Maps a completion transition to its UPDATE statement.
const fn update_shape(change: CompletionChange) -> &'static str {
    match change {
        CompletionChange::Unchanged => UPDATE_SQL,
        CompletionChange::JustCompleted => UPDATE_COMPLETE_SQL,
        CompletionChange::Reopened => UPDATE_REOPEN_SQL,
    }
}

fn row_to_todo(row: &PgRow, op: &'static str) -> Result<Todo, StoreError> {
    Ok(Todo {
        id: row.try_get("id").map_err(|e| StoreError::scan(op, e))?,
        title: row.try_get("title").map_err(|e| StoreError::scan(op, e))?,
        updated: row.try_get("updated").map_err(|e| StoreError::scan(op, e))?,
        completed: row
            .try_get("completed")
            .map_err(|e| StoreError::scan(op, e))?,
    })
}
