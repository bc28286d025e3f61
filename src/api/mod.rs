//! HTTP API: todo routes, health, metrics, and rate limiting.

pub mod handlers;
pub mod rate_limit;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

pub use handlers::{AppState, Envelope};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use routes::create_router;

/// Bind the listening socket.
pub async fn bind(host: &str, port: u16) -> crate::Result<TcpListener> {
    Ok(TcpListener::bind((host, port)).await?)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
