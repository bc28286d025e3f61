//! End-to-end tests for the todo service.
//!
//! Requests go through the full router (rate limiter, metrics and header
//! layers included). The health check tests bind a real listener on an ephemeral
//! port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use todo_api::api::{self, create_router, AppState};
use todo_api::health_check::{check_health, health_url};
use todo_api::todo::TodoStore;
use todo_api::AppError;

struct TestApp {
    store: Arc<TodoStore>,
    router: Router,
}

impl TestApp {
    fn seeded() -> Self {
        Self::with_store(TodoStore::with_demo_data())
    }

    fn with_store(store: TodoStore) -> Self {
        let store = Arc::new(store);
        let router = create_router(AppState::new(store.clone()));
        Self { store, router }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn ids(&self) -> Vec<u64> {
        self.store.list(None).await.iter().map(|t| t.id).collect()
    }
}

#[tokio::test]
async fn list_returns_all_items_with_count() {
    let app = TestApp::seeded();

    let (status, body) = app.send("GET", "/api/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_matches_name_and_description_case_insensitively() {
    let app = TestApp::seeded();

    let (_, by_name) = app.send("GET", "/api/todos?search=vUe", None).await;
    assert_eq!(by_name["count"], 1);
    assert_eq!(by_name["data"][0]["id"], 1);

    let (_, by_description) = app.send("GET", "/api/todos?search=PRODUCTION", None).await;
    assert_eq!(by_description["count"], 1);
    assert_eq!(by_description["data"][0]["id"], 2);

    let (_, none) = app.send("GET", "/api/todos?search=zzz", None).await;
    assert_eq!(none["count"], 0);
}

#[tokio::test]
async fn blank_name_is_rejected_without_changing_the_collection() {
    let app = TestApp::seeded();

    for body in [json!({}), json!({"name": ""}), json!({"name": "   \t"})] {
        let (status, response) = app.send("POST", "/api/todos", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert_eq!(response["message"], "Todo name must not be empty");
    }

    assert_eq!(app.store.len().await, 3);
}

#[tokio::test]
async fn create_adds_exactly_one_item_with_a_fresh_id() {
    let app = TestApp::seeded();
    let before = app.ids().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/todos",
            Some(json!({"name": "  Write tests  ", "description": " soon "})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Todo created successfully");
    let created = &body["data"];
    assert_eq!(created["name"], "Write tests");
    assert_eq!(created["description"], "soon");
    assert_eq!(created["priority"], "medium");
    assert_eq!(created["done"], false);
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let id = created["id"].as_u64().unwrap();
    assert!(!before.contains(&id));

    let after = app.ids().await;
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after[0], id);
}

#[tokio::test]
async fn update_unknown_id_is_404_and_changes_nothing() {
    let app = TestApp::seeded();
    let before = app.store.list(None).await;

    for uri in ["/api/todos/999", "/api/todos/not-a-number"] {
        let (status, body) = app.send("PUT", uri, Some(json!({"done": true}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");
    }

    assert_eq!(app.store.list(None).await, before);
}

#[tokio::test]
async fn unknown_id_wins_over_invalid_update_body() {
    let app = TestApp::seeded();
    let before = app.store.list(None).await;

    let bodies = [
        json!({"name": "  "}),
        json!({"done": "yes"}),
        json!({"priority": 5}),
        json!([1, 2, 3]),
    ];
    for body in bodies {
        let (status, reply) = app.send("PUT", "/api/todos/999", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(reply["message"], "Todo not found");
    }

    // the same bodies against an existing id are rejected as bad input
    let (status, _) = app
        .send("PUT", "/api/todos/1", Some(json!({"done": "yes"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.list(None).await, before);
}

#[tokio::test]
async fn partial_update_preserves_absent_fields() {
    let app = TestApp::seeded();
    let original = app.store.get(3).await.unwrap();

    let (status, body) = app
        .send("PUT", "/api/todos/3", Some(json!({"done": true})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Todo updated successfully");
    let updated = app.store.get(3).await.unwrap();
    assert!(updated.done);
    assert_eq!(updated.name, original.name);
    assert_eq!(updated.description, original.description);
    assert_eq!(updated.priority, original.priority);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at > original.updated_at);
}

#[tokio::test]
async fn update_with_null_description_clears_it() {
    let app = TestApp::seeded();

    let (status, body) = app
        .send("PUT", "/api/todos/1", Some(json!({"description": null})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "");
}

#[tokio::test]
async fn update_rejects_blank_name() {
    let app = TestApp::seeded();

    let (status, _) = app
        .send("PUT", "/api/todos/1", Some(json!({"name": "  "})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.get(1).await.unwrap().name, "Learn Vue 3");
}

#[tokio::test]
async fn delete_returns_the_removed_item() {
    let app = TestApp::seeded();

    let (status, body) = app.send("DELETE", "/api/todos/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 2);
    assert_eq!(body["message"], "Todo deleted successfully");
    assert_eq!(app.ids().await, vec![1, 3]);

    let (status, _) = app.send("DELETE", "/api/todos/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_delete_removes_exactly_the_completed_items() {
    let app = TestApp::seeded();
    app.send("POST", "/api/todos", Some(json!({"name": "four"}))).await;
    app.send("PUT", "/api/todos/4", Some(json!({"done": true}))).await;
    app.send("PUT", "/api/todos/1", Some(json!({"done": true}))).await;

    let (status, body) = app.send("DELETE", "/api/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 3);
    assert_eq!(body["message"], "Deleted 3 completed todos");
    assert_eq!(app.ids().await, vec![3]);

    let (_, again) = app.send("DELETE", "/api/todos", None).await;
    assert_eq!(again["deletedCount"], 0);
}

#[tokio::test]
async fn toggle_all_marks_every_item_and_refreshes_timestamps() {
    let app = TestApp::seeded();
    let before = app.store.list(None).await;

    let (status, body) = app
        .send(
            "PUT",
            "/api/todos/actions/toggle-all",
            Some(json!({"completed": true})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Marked all todos as completed");
    let after = app.store.list(None).await;
    assert!(after.iter().all(|t| t.done));
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        assert!(new.updated_at > old.updated_at);
    }

    let (_, body) = app
        .send(
            "PUT",
            "/api/todos/actions/toggle-all",
            Some(json!({"completed": false})),
        )
        .await;
    assert_eq!(body["message"], "Marked all todos as pending");
    assert!(app.store.list(None).await.iter().all(|t| !t.done));
}

#[tokio::test]
async fn stats_report_rounded_completion_rate() {
    let app = TestApp::seeded();

    let (status, body) = app.send("GET", "/api/todos/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"total": 3, "completed": 1, "pending": 2, "completionRate": 33})
    );

    let empty = TestApp::with_store(TodoStore::new());
    let (_, body) = empty.send("GET", "/api/todos/stats", None).await;
    assert_eq!(body["data"]["completionRate"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::seeded();

    let (status, body) = app.send("GET", "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/todos/stats"].is_object());
}

async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

#[tokio::test]
async fn health_check_passes_against_running_service() {
    let addr = spawn_server(create_router(AppState::default())).await;

    let report = check_health(&health_url("127.0.0.1", addr.port()), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.total_todos, Some(3));
    assert_eq!(report.database, None);
}

#[tokio::test]
async fn health_check_times_out_on_a_silent_server() {
    // accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let err = check_health(&health_url("127.0.0.1", addr.port()), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn health_check_reports_parse_failure_for_non_json_body() {
    let app = Router::new().route("/health", axum::routing::get(|| async { "fine" }));
    let addr = spawn_server(app).await;

    let err = check_health(&health_url("127.0.0.1", addr.port()), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn serve_answers_until_shutdown() {
    let listener = api::bind("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(api::serve(listener, AppState::default(), async move {
        let _ = stopped.await;
    }));

    let report = check_health(&health_url("127.0.0.1", addr.port()), Duration::from_secs(5))
        .await
        .unwrap();
    assert!(report.success);

    stop.send(()).unwrap();
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn binding_a_taken_port_is_an_io_error() {
    let held = api::bind("127.0.0.1", 0).await.unwrap();
    let port = held.local_addr().unwrap().port();

    let err = api::bind("127.0.0.1", port).await.unwrap_err();

    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn refused_health_check_keeps_exit_code_through_app_error() {
    // reserve a port, then free it so nothing is listening
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let err: AppError = check_health(&health_url("127.0.0.1", port), Duration::from_secs(2))
        .await
        .unwrap_err()
        .into();

    assert!(matches!(err, AppError::HealthCheck(_)));
    assert_eq!(err.exit_code(), 4);
}
