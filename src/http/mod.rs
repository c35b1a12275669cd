pub mod routes;
pub mod types;

use axum::Router;
use axum::routing::get;

use crate::domain::repository::TodoRepository;
use crate::http::routes::todos::AppState;

/// Builds the full application router: health probe plus the todo API.
pub fn app<R: TodoRepository + Clone>(state: AppState<R>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .merge(routes::todos::router(state))
}

async fn health() -> &'static str {
    "ok"
}
