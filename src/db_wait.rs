//! Startup gate that waits for the MySQL database to accept logins.
//!
//! Not used by `serve`. Containers that front a real database can run
//! `todo-api wait-for-db` before starting dependent services.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tracing::{info, warn};

use crate::config::Config;

/// Retry budget for the wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Pause between failed attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Build from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.db_wait_max_attempts,
            delay: config.db_wait_delay(),
        }
    }
}

/// How the wait ended. Either way startup proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Authenticated on this attempt.
    Connected { attempts: u32 },
    /// Every attempt failed.
    GaveUp { attempts: u32 },
}

impl WaitOutcome {
    /// Whether the database answered.
    pub fn is_connected(&self) -> bool {
        matches!(self, WaitOutcome::Connected { .. })
    }
}

/// Call `attempt` until it succeeds or the budget runs out.
pub async fn wait_until_ready<F, Fut, E>(policy: RetryPolicy, mut attempt: F) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(()) => {
                info!(attempts, "database connection established");
                return WaitOutcome::Connected { attempts };
            }
            Err(e) if attempts >= policy.max_attempts => {
                warn!(
                    "database still unreachable after {} attempts, continuing startup: {}",
                    attempts, e
                );
                return WaitOutcome::GaveUp { attempts };
            }
            Err(e) => {
                info!(
                    "waiting for database... ({}/{}): {}",
                    attempts, policy.max_attempts, e
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Connection options for the configured database.
pub fn connect_options(config: &Config) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .password(&config.db_pass)
        .database(&config.db_name)
}

/// Open and close one connection, proving the credentials work.
pub async fn authenticate(options: &MySqlConnectOptions) -> crate::Result<()> {
    let connection = options.connect().await?;
    connection.close().await?;
    Ok(())
}

/// Wait for the configured database.
pub async fn wait_for_database(config: &Config) -> WaitOutcome {
    let options = connect_options(config);
    info!(
        host = %config.db_host,
        port = config.db_port,
        database = %config.db_name,
        "waiting for database"
    );
    wait_until_ready(RetryPolicy::from_config(config), || authenticate(&options)).await
}
