use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::to_bytes;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use todo_api::domain::error::StoreError;
use todo_api::domain::repository::TodoRepository;
use todo_api::domain::todo::{CompletionChange, CreateTodo, Todo, TodoId, UpdateTodo};
use todo_api::http::{self, routes::todos::AppState};

/// In-memory stand-in for the Postgres store, following the same rules:
/// seed-on-empty bootstrap, server-assigned ids continuing past the seeds,
/// completion stamps taken from the store clock, hard idempotent delete.
#[derive(Clone, Default)]
struct MemoryTodoRepository {
    inner: Arc<Mutex<MemoryState>>,
}

struct MemoryState {
    rows: HashMap<TodoId, Todo>,
    next_id: TodoId,
    last_clock: NaiveDateTime,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: 1,
            last_clock: NaiveDateTime::default(),
        }
    }
}

impl MemoryState {
    /// Strictly increasing clock, so ordering assertions stay
    /// deterministic even when two calls land within one timer tick.
    fn now(&mut self) -> NaiveDateTime {
        let mut now = Utc::now().naive_utc();
        if now <= self.last_clock {
            now = self.last_clock + Duration::microseconds(1);
        }
        self.last_clock = now;
        now
    }
}

fn seed_rows() -> Vec<Todo> {
    let stamp = |day: u32, hour: u32, minute: u32| {
        NaiveDate::from_ymd_opt(2021, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    };
    vec![
        Todo {
            id: 1,
            title: "Install and configure todo app".into(),
            updated: stamp(28, 12, 0),
            completed: Some(stamp(28, 12, 0)),
        },
        Todo {
            id: 2,
            title: "Add your own todo".into(),
            updated: stamp(28, 12, 0),
            completed: None,
        },
        Todo {
            id: 3,
            title: "Mark task 1 done".into(),
            updated: stamp(27, 14, 26),
            completed: None,
        },
    ]
}

#[async_trait]
impl TodoRepository for MemoryTodoRepository {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        if !state.rows.is_empty() {
            return Ok(());
        }
        for todo in seed_rows() {
            state.next_id = state.next_id.max(todo.id + 1);
            state.rows.insert(todo.id, todo);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let state = self.inner.lock().unwrap();
        let mut todos: Vec<Todo> = state.rows.values().cloned().collect();
        todos.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(todos)
    }

    async fn create(&self, input: CreateTodo) -> Result<Todo, StoreError> {
        let mut state = self.inner.lock().unwrap();
        let now = state.now();
        let id = state.next_id;
        state.next_id += 1;
        let todo = Todo {
            id,
            title: input.title,
            updated: now,
            completed: input.complete.then_some(now),
        };
        state.rows.insert(id, todo.clone());
        Ok(todo)
    }

    async fn read(&self, id: TodoId) -> Result<Todo, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn update(&self, input: UpdateTodo) -> Result<Todo, StoreError> {
        let mut state = self.inner.lock().unwrap();
        let now = state.now();
        let row = state
            .rows
            .get_mut(&input.id)
            .ok_or(StoreError::NotFound { id: input.id })?;
        match CompletionChange::between(row.is_complete(), input.complete) {
            CompletionChange::Unchanged => {}
            CompletionChange::JustCompleted => row.completed = Some(now),
            CompletionChange::Reopened => row.completed = None,
        }
        row.title = input.title;
        row.updated = now;
        Ok(row.clone())
    }

    async fn delete(&self, id: TodoId) -> Result<(), StoreError> {
        self.inner.lock().unwrap().rows.remove(&id);
        Ok(())
    }
}

async fn bootstrapped_app() -> (Router, MemoryTodoRepository) {
    let repo = MemoryTodoRepository::default();
    repo.ensure_schema().await.unwrap();
    let app = http::app(AppState { repo: repo.clone() });
    (app, repo)
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    form: Option<&str>,
) -> hyper::Response<axum::body::Body> {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let req = Request::builder()
        .method(Method::from_bytes(method.as_bytes()).unwrap())
        .uri(path);
    let req = match form {
        Some(body) => req
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

async fn body_json(res: hyper::Response<axum::body::Body>) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Every serialized todo must keep the derived flag consistent with the
/// timestamp's nullity.
fn assert_complete_consistent(todo: &serde_json::Value) {
    assert_eq!(
        todo["complete"].as_bool().unwrap(),
        !todo["completed"].is_null(),
        "derived complete flag drifted from completed: {todo}"
    );
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _repo) = bootstrapped_app().await;
    let res = request(&app, "GET", "/healthz", None).await;
    assert_eq!(res.status(), 200);
    let bytes = to_bytes(res.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn bootstrap_seeds_once_and_second_run_touches_nothing() {
    let (app, repo) = bootstrapped_app().await;

    // Second bootstrap against the populated store.
    repo.ensure_schema().await.unwrap();

    let res = request(&app, "GET", "/api/v1/todo", None).await;
    assert_eq!(res.status(), 200);
    let body = body_json(res).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);

    let mut ids: Vec<i64> = items.iter().map(|t| t["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, [1, 2, 3]);

    for item in items {
        assert_complete_consistent(item);
    }
    let seeded_done = items.iter().find(|t| t["id"] == 1).unwrap();
    assert_eq!(seeded_done["title"], "Install and configure todo app");
    assert_eq!(seeded_done["complete"], true);
}

#[tokio::test]
async fn create_without_complete_yields_null_completion() {
    let (app, _repo) = bootstrapped_app().await;

    let res = request(&app, "POST", "/api/v1/todo", Some("title=errands")).await;
    assert_eq!(res.status(), 201);
    let created = body_json(res).await;
    assert_eq!(created["title"], "errands");
    assert!(created["completed"].is_null());
    assert_eq!(created["complete"], false);
    // Ids continue past the seeded rows.
    assert_eq!(created["id"], 4);

    let res = request(&app, "GET", "/api/v1/todo/4", None).await;
    assert_eq!(res.status(), 200);
    let read_back = body_json(res).await;
    assert!(read_back["completed"].is_null());
    assert_complete_consistent(&read_back);
}

#[tokio::test]
async fn create_with_complete_stamps_completion_at_creation_time() {
    let (app, _repo) = bootstrapped_app().await;

    let res = request(&app, "POST", "/api/v1/todo", Some("title=prepped&complete=true")).await;
    assert_eq!(res.status(), 201);
    let created = body_json(res).await;
    assert_eq!(created["complete"], true);
    // Both timestamps come from the same clock reading.
    assert_eq!(created["completed"], created["updated"]);
    assert_complete_consistent(&created);
}

#[tokio::test]
async fn complete_field_truthiness_matches_the_form_contract() {
    let (app, _repo) = bootstrapped_app().await;

    // "false" and empty are false, any other non-empty value is true.
    let res = request(&app, "POST", "/api/v1/todo", Some("title=a&complete=false")).await;
    assert_eq!(body_json(res).await["complete"], false);

    let res = request(&app, "POST", "/api/v1/todo", Some("title=b&complete=")).await;
    assert_eq!(body_json(res).await["complete"], false);

    let res = request(&app, "POST", "/api/v1/todo", Some("title=c&complete=yes")).await;
    assert_eq!(body_json(res).await["complete"], true);
}

#[tokio::test]
async fn update_transitions_follow_the_decision_table() {
    let (app, _repo) = bootstrapped_app().await;

    let res = request(&app, "POST", "/api/v1/todo", Some("title=chore")).await;
    let created = body_json(res).await;
    let id = created["id"].as_i64().unwrap();
    let first_updated = created["updated"].clone();

    // Incomplete -> complete: completed gets stamped.
    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/todo/{id}"),
        Some("title=chore&complete=true"),
    )
    .await;
    assert_eq!(res.status(), 200);
    let completed_once = body_json(res).await;
    assert_eq!(completed_once["complete"], true);
    assert!(!completed_once["completed"].is_null());
    assert_ne!(completed_once["updated"], first_updated);
    let completion_stamp = completed_once["completed"].clone();

    // Complete -> complete: completion stamp untouched, updated advances.
    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/todo/{id}"),
        Some("title=chore+renamed&complete=true"),
    )
    .await;
    let still_complete = body_json(res).await;
    assert_eq!(still_complete["title"], "chore renamed");
    assert_eq!(still_complete["completed"], completion_stamp);
    assert_ne!(still_complete["updated"], completed_once["updated"]);

    // Complete -> incomplete: completion cleared.
    let res = request(
        &app,
        "PUT",
        &format!("/api/v1/todo/{id}"),
        Some("title=chore+renamed"),
    )
    .await;
    let reopened = body_json(res).await;
    assert_eq!(reopened["complete"], false);
    assert!(reopened["completed"].is_null());
    assert_complete_consistent(&reopened);
}

#[tokio::test]
async fn list_orders_by_updated_descending() {
    let (app, _repo) = bootstrapped_app().await;

    // Created in order: ids 4, 5, 6.
    for title in ["first", "second", "third"] {
        let res = request(&app, "POST", "/api/v1/todo", Some(&format!("title={title}"))).await;
        assert_eq!(res.status(), 201);
    }
    // Touch the oldest of the three; it must move to the front.
    let res = request(&app, "PUT", "/api/v1/todo/4", Some("title=first+again")).await;
    assert_eq!(res.status(), 200);

    let res = request(&app, "GET", "/api/v1/todo", None).await;
    let body = body_json(res).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();

    assert_eq!(&ids[..3], [4, 6, 5]);
    // Seeds trail, oldest last; rows 1 and 2 share a timestamp so only
    // their membership is pinned down.
    assert_eq!(ids.len(), 6);
    assert_eq!(ids[5], 3);
    let mut tied: Vec<i64> = ids[3..5].to_vec();
    tied.sort_unstable();
    assert_eq!(tied, [1, 2]);
}

#[tokio::test]
async fn delete_is_idempotent_and_read_after_delete_is_not_found() {
    let (app, _repo) = bootstrapped_app().await;

    let res = request(&app, "POST", "/api/v1/todo", Some("title=doomed")).await;
    let id = body_json(res).await["id"].as_i64().unwrap();

    let res = request(&app, "DELETE", &format!("/api/v1/todo/{id}"), None).await;
    assert_eq!(res.status(), 204);

    // Deleting the same id again still succeeds.
    let res = request(&app, "DELETE", &format!("/api/v1/todo/{id}"), None).await;
    assert_eq!(res.status(), 204);

    let res = request(&app, "GET", &format!("/api/v1/todo/{id}"), None).await;
    assert_eq!(res.status(), 404);
    let body = body_json(res).await;
    assert_eq!(body["text"], "todo not found");
    assert_eq!(body["details"], format!("todo id: {id}"));
}

#[tokio::test]
async fn read_of_absent_id_reports_not_found_body() {
    let (app, _repo) = bootstrapped_app().await;
    let res = request(&app, "GET", "/api/v1/todo/999", None).await;
    assert_eq!(res.status(), 404);
    let body = body_json(res).await;
    assert_eq!(body["text"], "todo not found");
    assert_eq!(body["details"], "todo id: 999");
}

#[tokio::test]
async fn update_of_absent_id_reports_not_found() {
    let (app, _repo) = bootstrapped_app().await;
    let res = request(&app, "PUT", "/api/v1/todo/999", Some("title=ghost")).await;
    assert_eq!(res.status(), 404);
}
