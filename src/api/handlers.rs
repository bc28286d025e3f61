//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::OpenApi;

use super::rate_limit::{RateLimitConfig, RateLimiter};
use crate::config::Environment;
use crate::error::TodoError;
use crate::metrics;
use crate::todo::{NewTodo, SearchQuery, TodoItem, TodoPatch, TodoStats, TodoStore, ToggleAll};

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The todo collection.
    pub store: Arc<TodoStore>,
    /// Environment reported by `/health`.
    pub environment: Environment,
    /// Per-client request limiter.
    pub limiter: RateLimiter,
    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state around a store with default limits and no metrics.
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self {
            store,
            environment: Environment::default(),
            limiter: RateLimiter::new(RateLimitConfig::default()),
            metrics: None,
        }
    }

    /// Set the reported environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the rate limiter settings.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::new(config);
        self
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(TodoStore::with_demo_data()))
    }
}

/// Uniform JSON response wrapper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            count: None,
            deleted_count: None,
        }
    }

    /// Failed response with a message and nothing else.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            count: None,
            deleted_count: None,
        }
    }

    /// Attach a message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an item count.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl Envelope<()> {
    /// Successful response with a message and no data.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            ..Self::failure(message)
        }
    }

    /// Attach a deleted-item count.
    pub fn deleted(mut self, deleted: usize) -> Self {
        self.deleted_count = Some(deleted);
        self
    }
}

/// Route map in the service descriptor.
#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub todos: &'static str,
    pub stats: &'static str,
}

/// `GET /` response.
#[derive(Debug, Serialize)]
pub struct ServiceDescriptor {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

/// `GET /health` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub environment: String,
    pub storage: &'static str,
    pub total_todos: usize,
}

/// Unwrap a JSON body, turning decode failures into a 400 envelope.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, TodoError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| TodoError::InvalidBody(rejection.body_text()))
}

/// Parse a path id. Anything that is not a number cannot match a todo.
fn todo_id(raw: &str) -> Result<u64, TodoError> {
    raw.parse().map_err(|_| TodoError::NotFound { id: raw.to_string() })
}

/// Service descriptor.
pub async fn root() -> impl IntoResponse {
    Json(ServiceDescriptor {
        message: "Todo API Server",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health: "/health",
            todos: "/api/todos",
            stats: "/api/todos/stats",
        },
    })
}

/// Liveness payload - always returns 200.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        success: true,
        message: "Todo API service is running",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.environment.to_string(),
        storage: "memory",
        total_todos: state.store.len().await,
    })
}

/// List todos, optionally filtered.
#[utoipa::path(
    get,
    path = "/api/todos",
    params(SearchQuery),
    responses((status = 200, description = "Matching todos, newest first"))
)]
#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let todos = state.store.list(query.search.as_deref()).await;
    let count = todos.len();
    Json(Envelope::ok(todos).count(count))
}

/// Create a todo.
#[utoipa::path(
    post,
    path = "/api/todos",
    request_body = NewTodo,
    responses(
        (status = 201, description = "Todo created"),
        (status = 400, description = "Name missing or blank")
    )
)]
#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let draft = body(payload)?.validate()?;
    let todo = state.store.create(draft).await;

    info!(id = todo.id, name = %todo.name, "todo created");
    metrics::inc_todos_created();

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(todo).message("Todo created successfully")),
    ))
}

/// Partially update a todo.
#[utoipa::path(
    put,
    path = "/api/todos/{id}",
    params(("id" = u64, Path, description = "Todo id")),
    request_body = TodoPatch,
    responses(
        (status = 200, description = "Todo updated"),
        (status = 400, description = "Blank name or malformed body"),
        (status = 404, description = "No todo with this id")
    )
)]
#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Envelope<TodoItem>>, TodoError> {
    let key = todo_id(&id)?;
    // only syntax errors are reported before the lookup
    let raw = body(payload)?;

    let todo = state
        .store
        .try_update(key, || {
            serde_json::from_value::<TodoPatch>(raw)
                .map_err(|e| TodoError::InvalidBody(e.to_string()))?
                .validate()
        })
        .await?
        .ok_or(TodoError::NotFound { id })?;

    info!(id = todo.id, "todo updated");
    Ok(Json(Envelope::ok(todo).message("Todo updated successfully")))
}

/// Delete one todo.
#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    params(("id" = u64, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo deleted, returned in `data`"),
        (status = 404, description = "No todo with this id")
    )
)]
#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<TodoItem>>, TodoError> {
    let key = todo_id(&id)?;
    let todo = state
        .store
        .delete(key)
        .await
        .ok_or(TodoError::NotFound { id })?;

    info!(id = todo.id, "todo deleted");
    metrics::inc_todos_deleted(1);

    Ok(Json(Envelope::ok(todo).message("Todo deleted successfully")))
}

/// Delete every completed todo.
#[utoipa::path(
    delete,
    path = "/api/todos",
    responses((status = 200, description = "Completed todos removed"))
)]
#[instrument(skip(state))]
pub async fn delete_completed(State(state): State<AppState>) -> impl IntoResponse {
    let deleted = state.store.delete_completed().await;

    info!(deleted, "completed todos cleared");
    metrics::inc_todos_deleted(deleted as u64);

    Json(Envelope::done(format!("Deleted {deleted} completed todos")).deleted(deleted))
}

/// Set every todo's completion flag.
#[utoipa::path(
    put,
    path = "/api/todos/actions/toggle-all",
    request_body = ToggleAll,
    responses(
        (status = 200, description = "All todos updated"),
        (status = 400, description = "Missing or non-boolean `completed`")
    )
)]
#[instrument(skip(state, payload))]
pub async fn toggle_all(
    State(state): State<AppState>,
    payload: Result<Json<ToggleAll>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let ToggleAll { completed } = body(payload)?;
    let todos = state.store.set_all_done(completed).await;

    let label = if completed { "completed" } else { "pending" };
    info!(completed, count = todos.len(), "toggled all todos");

    Ok(Json(
        Envelope::ok(todos).message(format!("Marked all todos as {label}")),
    ))
}

/// Completion statistics.
#[utoipa::path(
    get,
    path = "/api/todos/stats",
    responses((status = 200, description = "Completion counters", body = TodoStats))
)]
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(Envelope::ok(state.store.stats().await))
}

/// Prometheus exposition, 404 when no recorder is installed.
pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(Envelope::<()>::failure("Metrics are not enabled")),
        )
            .into_response(),
    }
}

/// OpenAPI description of the todo routes.
#[derive(OpenApi)]
#[openapi(
    info(title = "Todo API", description = "In-memory todo list service"),
    paths(list_todos, create_todo, update_todo, delete_todo, delete_completed, toggle_all, stats),
    components(schemas(TodoItem, NewTodo, TodoPatch, ToggleAll, TodoStats))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
