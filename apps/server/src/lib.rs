//! Meetapp Server
//!
//! Serves the meetups HTTP API and runs the subscription notification
//! worker as a background task in the same process.
//!
//! ## Architecture
//!
//! ```text
//! POST /api/v1/meetups/:id/subscriptions
//!   ↓ (validated subscribe)
//! MeetupService<MemoryStore | PostgresStore>
//!   ↓ (enqueue SubscriptionMailJob)
//! JobQueue
//!   ↓ (reserve, dispatch by job type)
//! Worker → SubscriptionMailHandler → SMTP
//! ```
//!
//! ## Features
//!
//! - Store selection by environment: Postgres when `DATABASE_URL` is set
//!   (migrations applied at startup), in-memory otherwise
//! - Retry with exponential backoff and a dead-letter list for failed jobs
//! - Graceful shutdown on SIGINT/SIGTERM for both the server and the worker

pub mod config;

use axum::{Json, Router, routing::get};
use domain_meetups::{MeetupService, MeetupStore, MemoryStore, PostgresStore, handlers};
use eyre::{Result, WrapErr};
use job_queue::{HandlerRegistry, JobQueue, QueueConfig, Worker};
use mailer::{SmtpProvider, SubscriptionMailHandler, SubscriptionMailJob, TemplateEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Environment, ServerConfig};

/// Run the server and the notification worker until shutdown.
pub async fn run() -> Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "Starting meetapp server"
    );

    // Shutdown signal fans out to the HTTP server and the worker.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let queue = JobQueue::new();

    // Wire the notification pipeline: one handler per job type.
    let provider = SmtpProvider::from_env().wrap_err("Failed to configure SMTP provider")?;
    let templates = Arc::new(TemplateEngine::new().wrap_err("Failed to build email templates")?);
    let mail_handler = SubscriptionMailHandler::new(Arc::new(provider), templates);

    let mut registry = HandlerRegistry::new();
    registry
        .register_job::<SubscriptionMailJob>(Arc::new(mail_handler))
        .map_err(|e| eyre::eyre!("Failed to register mail handler: {}", e))?;

    let worker = Worker::new(
        queue.clone(),
        Arc::new(registry),
        QueueConfig::new().with_worker_id("meetapp-worker-1"),
    );
    let worker_shutdown = shutdown_rx.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_shutdown).await });
    info!("Notification worker started");

    // Store selection: Postgres when DATABASE_URL is set, in-memory otherwise.
    match config.database_url.clone() {
        Some(url) => {
            info!("Connecting to PostgreSQL...");
            let db = sea_orm::Database::connect(&url)
                .await
                .wrap_err("Failed to connect to PostgreSQL")?;

            use migration::MigratorTrait;
            migration::Migrator::up(&db, None)
                .await
                .wrap_err("Failed to apply migrations")?;
            info!("Connected to PostgreSQL, migrations applied");

            serve(PostgresStore::new(db), queue, &config, shutdown_rx).await?;
        }
        None => {
            info!("No DATABASE_URL set, using the in-memory store");
            serve(MemoryStore::new(), queue, &config, shutdown_rx).await?;
        }
    }

    worker_handle
        .await
        .wrap_err("Notification worker panicked")?;

    info!("Meetapp server stopped");
    Ok(())
}

/// Serve the HTTP API over the given store until shutdown.
async fn serve<S: MeetupStore + 'static>(
    store: S,
    queue: JobQueue,
    config: &ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let service = MeetupService::new(store, queue);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", handlers::router(service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("HTTP server shutting down");
        })
        .await
        .wrap_err("HTTP server failed")?;

    Ok(())
}

/// Liveness endpoint.
///
/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if environment.is_production() {
            EnvFilter::new("info,tower_http=info,sea_orm=warn")
        } else {
            EnvFilter::new("debug,tower_http=debug")
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if environment.is_production() {
        builder.json().with_target(false).try_init()
    } else {
        builder.try_init()
    };

    // Already-set subscribers are fine (tests, embedding).
    if let Err(e) = result {
        error!("Failed to initialize tracing: {}", e);
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}
