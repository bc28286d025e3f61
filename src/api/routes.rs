//! HTTP API route definitions.

use axum::{
    http::{header, HeaderName, HeaderValue},
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::handlers::{
    create_todo, delete_completed, delete_todo, health, list_todos, openapi, render_metrics,
    root, stats, toggle_all, update_todo, AppState,
};
use super::rate_limit;
use crate::metrics::track_requests;

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        // Health endpoints
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        // Todo endpoints
        .route(
            "/api/todos",
            get(list_todos).post(create_todo).delete(delete_completed),
        )
        .route("/api/todos/stats", get(stats))
        .route("/api/todos/actions/toggle-all", put(toggle_all))
        .route("/api/todos/:id", put(update_todo).delete(delete_todo))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit::enforce,
        ))
        // outside the limiter so rejected requests are counted too
        .layer(middleware::from_fn(track_requests));

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("0"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
