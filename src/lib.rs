//! In-memory todo list REST service.
//!
//! The service keeps an ordered collection of todo items in process memory
//! and exposes CRUD routes over it, each answering with a uniform JSON
//! envelope:
//!
//! ```text
//! { "success": true, "message": "...", "data": ..., "count": 3 }
//! ```
//!
//! Nothing is persisted; a restart starts from the demo seed (or empty).
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`todo`]: Todo records and the in-memory store
//! - [`api`]: HTTP routes, envelopes, and rate limiting
//! - [`metrics`]: Prometheus metrics
//! - [`health_check`]: One-shot `/health` check
//! - [`db_wait`]: Database readiness gate
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod db_wait;
pub mod error;
pub mod health_check;
pub mod metrics;
pub mod todo;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
