use async_trait::async_trait;

use super::error::StoreError;
use super::todo::{CreateTodo, Todo, TodoId, UpdateTodo};

/// Storage contract for the todo table. Implementations hand back plain
/// domain values and classified [`StoreError`]s; nothing HTTP- or
/// driver-specific crosses this seam.
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    /// Idempotent schema bootstrap: create and seed the table when it is
    /// absent, leave an existing store untouched. Invoked once at startup.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Every record, ordered by `updated` descending. An empty table
    /// yields an empty vec, not an error.
    async fn list(&self) -> Result<Vec<Todo>, StoreError>;

    /// Inserts a record with a server-assigned id, `updated = now` and
    /// `completed = now` iff requested, and returns the stored row.
    async fn create(&self, input: CreateTodo) -> Result<Todo, StoreError>;

    /// Looks up one record by id. An absent id is
    /// [`StoreError::NotFound`], never a zero-valued record.
    async fn read(&self, id: TodoId) -> Result<Todo, StoreError>;

    /// Replaces the title, advances `updated`, and applies the requested
    /// completion transition against the stored state. Reports
    /// [`StoreError::NotFound`] when the record is absent, including when
    /// it vanishes between the prior read and the write.
    async fn update(&self, input: UpdateTodo) -> Result<Todo, StoreError>;

    /// Hard delete by id. Deleting an absent id succeeds (idempotent).
    async fn delete(&self, id: TodoId) -> Result<(), StoreError>;
}
