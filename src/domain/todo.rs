use chrono::NaiveDateTime;

/// Identifier assigned by the store's primary-key sequence. Never reused.
pub type TodoId = i32;

/// A single task record as persisted in the `todo` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    /// Set to the database clock on every create and every update.
    pub updated: NaiveDateTime,
    /// Wall-clock time completion was recorded; `None` means not completed.
    pub completed: Option<NaiveDateTime>,
}

impl Todo {
    /// Derived completion flag. `completed` is the single source of truth;
    /// no independent boolean is stored anywhere.
    pub fn is_complete(&self) -> bool {
        self.completed.is_some()
    }
}

/// Input for creating a record. The id and both timestamps are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct CreateTodo {
    pub title: String,
    pub complete: bool,
}

/// Input for updating a record. The title is always replaced; `complete`
/// is the requested completion state, compared against the stored one.
#[derive(Debug, Clone)]
pub struct UpdateTodo {
    pub id: TodoId,
    pub title: String,
    pub complete: bool,
}

/// How an update moves the completion state, derived from the stored
/// record and the requested flag. Each variant corresponds to exactly one
/// UPDATE shape; completion timestamps come from the database clock, never
/// from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    /// State untouched; only title and `updated` move.
    Unchanged,
    /// Incomplete before, complete requested: stamp `completed` with now.
    JustCompleted,
    /// Complete before, incomplete requested: clear `completed`.
    Reopened,
}

impl CompletionChange {
    pub fn between(was_complete: bool, requested_complete: bool) -> Self {
        match (was_complete, requested_complete) {
            (false, true) => Self::JustCompleted,
            (true, false) => Self::Reopened,
            (false, false) | (true, true) => Self::Unchanged,
        }
    }
}
