use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::error::StoreError;
use crate::domain::todo::{Todo, TodoId};

/// Wire shape of a todo. The `complete` flag is derived from `completed`
/// here at the edge; the stored record carries only the timestamp.
#[derive(Debug, Serialize)]
pub struct TodoBody {
    pub id: TodoId,
    pub title: String,
    pub updated: NaiveDateTime,
    pub completed: Option<NaiveDateTime>,
    pub complete: bool,
}

impl From<Todo> for TodoBody {
    fn from(todo: Todo) -> Self {
        Self {
            complete: todo.is_complete(),
            id: todo.id,
            title: todo.title,
            updated: todo.updated,
            completed: todo.completed,
        }
    }
}

/// Status message for non-todo responses, e.g. the not-found body.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub text: String,
    pub details: String,
}

impl ApiMessage {
    pub fn new(text: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: details.into(),
        }
    }
}

/// Translates storage failures into HTTP outcomes: the dedicated
/// not-found signal becomes a 404 with a message body, every other
/// classified error a 500 carrying the operation and stage text.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            StoreError::NotFound { id } => (
                StatusCode::NOT_FOUND,
                Json(ApiMessage::new("todo not found", format!("todo id: {id}"))),
            )
                .into_response(),
            err => {
                tracing::error!(error = %err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
