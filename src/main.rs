//! Todo API entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use todo_api::api::{self, AppState, RateLimitConfig};
use todo_api::config::{Config, LogFormat};
use todo_api::db_wait::{wait_for_database, WaitOutcome};
use todo_api::health_check::{check_health, health_url};
use todo_api::metrics;
use todo_api::todo::TodoStore;
use todo_api::utils::shutdown_signal;
use todo_api::AppError;

/// In-memory todo list REST service.
#[derive(Parser, Debug)]
#[command(name = "todo-api")]
#[command(about = "Todo list REST service with health-check and database-wait tooling")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check a running service's /health endpoint once.
    HealthCheck {
        /// Host to check (overrides HEALTH_CHECK_HOST).
        #[arg(long)]
        host: Option<String>,

        /// Port to check (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Request timeout in milliseconds (overrides HEALTH_CHECK_TIMEOUT_MS).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Wait for the MySQL database to accept connections.
    WaitForDb,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (reads .env first)
    let config = Config::load()?;

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("todo_api=debug,info")
    } else {
        EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Text => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::Serve { port }) => cmd_serve(config, port.or(args.port)).await,
        Some(Command::HealthCheck {
            host,
            port,
            timeout_ms,
        }) => cmd_health_check(&config, host, port.or(args.port), timeout_ms).await,
        Some(Command::WaitForDb) => cmd_wait_for_db(&config).await,
        Some(Command::CheckConfig) => cmd_check_config(&config),
        None => cmd_serve(config, args.port).await,
    }
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TODO API - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Listen: {}:{}", config.host, config.port);
    println!("  Environment: {}", config.environment);
    println!("  Seed Demo Data: {}", config.seed_demo_data);
    println!("  Log: {} ({})", config.rust_log, config.log_format);
    println!(
        "  Rate Limit: {} requests / {}s (trust proxy: {})",
        config.rate_limit_max_requests, config.rate_limit_window_secs, config.trust_proxy
    );
    println!(
        "  Health Check: {} timeout {}ms",
        health_url(&config.health_check_host, config.port),
        config.health_check_timeout_ms
    );
    println!(
        "  Database: {}@{}:{}/{} ({} attempts, {}ms apart)",
        config.db_user,
        config.db_host,
        config.db_port,
        config.db_name,
        config.db_wait_max_attempts,
        config.db_wait_delay_ms
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check /health once and exit with the failure's code.
async fn cmd_health_check(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.health_check_host.clone());
    let url = health_url(&host, port.unwrap_or(config.port));
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.health_check_timeout());

    match check_health(&url, timeout).await.map_err(AppError::from) {
        Ok(_) => {
            println!("Health check passed");
            Ok(())
        }
        Err(e) => {
            println!("Health check failed: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Wait for the database, then exit successfully either way.
async fn cmd_wait_for_db(config: &Config) -> anyhow::Result<()> {
    config.ensure_valid()?;

    match wait_for_database(config).await {
        WaitOutcome::Connected { attempts } => {
            info!("Database ready after {} attempt(s)", attempts);
        }
        WaitOutcome::GaveUp { attempts } => {
            info!("Database not ready after {} attempts, continuing anyway", attempts);
        }
    }

    Ok(())
}

/// Run the HTTP service.
async fn cmd_serve(mut config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }

    // Validate configuration
    if let Err(e) = config.ensure_valid() {
        error!("{}", e);
        return Err(e.into());
    }

    // Initialize metrics
    let metrics_handle = metrics::init_metrics()?;

    let store = Arc::new(if config.seed_demo_data {
        TodoStore::with_demo_data()
    } else {
        TodoStore::new()
    });

    let app_state = AppState::new(store.clone())
        .with_environment(config.environment)
        .with_rate_limit(RateLimitConfig::from_config(&config))
        .with_metrics(metrics_handle);

    // Periodically forget idle clients
    let limiter = app_state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.config().window);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.prune();
        }
    });

    // Start HTTP server
    let listener = api::bind(&config.host, config.port).await?;
    let addr = listener.local_addr()?;

    info!("Server listening on {}", addr);
    info!("Environment: {}", config.environment);
    info!("Storage: memory");
    info!("Initial todos: {}", store.len().await);

    api::serve(listener, app_state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}
