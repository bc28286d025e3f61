//! One-shot health check against a running service.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::HealthCheckError;

/// The parts of the `/health` payload the check looks at.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Only present when a service tracks a database connection.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub total_todos: Option<u64>,
}

impl HealthReport {
    /// Healthy when `success` is set and any reported database is connected.
    pub fn is_healthy(&self) -> bool {
        self.success
            && self
                .database
                .as_deref()
                .map_or(true, |state| state == "connected")
    }
}

/// Health endpoint URL for a host and port.
pub fn health_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/health")
}

/// Decide health from a raw response body.
pub fn evaluate(body: &str) -> Result<HealthReport, HealthCheckError> {
    let report: HealthReport = serde_json::from_str(body).map_err(HealthCheckError::Parse)?;
    if report.is_healthy() {
        Ok(report)
    } else {
        Err(HealthCheckError::Unhealthy {
            message: report.message.unwrap_or_default(),
        })
    }
}

/// Issue one GET against `url` and evaluate the answer. Never retries.
#[instrument]
pub async fn check_health(url: &str, timeout: Duration) -> Result<HealthReport, HealthCheckError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(HealthCheckError::Request)?;

    let body = client
        .get(url)
        .send()
        .await
        .map_err(classify)?
        .text()
        .await
        .map_err(classify)?;

    match evaluate(&body) {
        Ok(report) => {
            info!(total_todos = ?report.total_todos, "health check passed");
            Ok(report)
        }
        Err(e) => {
            warn!("health check failed: {}", e);
            Err(e)
        }
    }
}

fn classify(error: reqwest::Error) -> HealthCheckError {
    if error.is_timeout() {
        HealthCheckError::Timeout
    } else {
        HealthCheckError::Request(error)
    }
}
