use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;

use crate::domain::repository::TodoRepository;
use crate::domain::todo::{CreateTodo, TodoId, UpdateTodo};
use crate::http::types::{ApiError, TodoBody};

/// Shared handler state: the process-wide storage handle.
#[derive(Clone)]
pub struct AppState<R: TodoRepository> {
    pub repo: R,
}

pub fn router<R: TodoRepository + Clone>(state: AppState<R>) -> Router {
    Router::new()
        .route("/api/v1/todo", get(list_todos::<R>).post(create_todo::<R>))
        .route(
            "/api/v1/todo/:id",
            get(read_todo::<R>)
                .put(update_todo::<R>)
                .post(update_todo::<R>)
                .delete(delete_todo::<R>),
        )
        .with_state(state)
}

/// Form payload shared by create and update. The UI submits `complete` as
/// free text: any non-empty value other than `"false"` counts as true.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    complete: String,
}

impl TodoForm {
    fn requested_complete(&self) -> bool {
        !self.complete.is_empty() && self.complete != "false"
    }
}

async fn list_todos<R: TodoRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<TodoBody>>, ApiError> {
    let todos = state.repo.list().await?;
    Ok(Json(todos.into_iter().map(TodoBody::from).collect()))
}

async fn create_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Form(form): Form<TodoForm>,
) -> Result<(StatusCode, Json<TodoBody>), ApiError> {
    let complete = form.requested_complete();
    let todo = state
        .repo
        .create(CreateTodo {
            title: form.title,
            complete,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(todo.into())))
}

async fn read_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<TodoId>,
) -> Result<Json<TodoBody>, ApiError> {
    let todo = state.repo.read(id).await?;
    Ok(Json(todo.into()))
}

async fn update_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<TodoId>,
    Form(form): Form<TodoForm>,
) -> Result<Json<TodoBody>, ApiError> {
    let complete = form.requested_complete();
    let todo = state
        .repo
        .update(UpdateTodo {
            id,
            title: form.title,
            complete,
        })
        .await?;
    Ok(Json(todo.into()))
}

async fn delete_todo<R: TodoRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<TodoId>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
