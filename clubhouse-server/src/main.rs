//! clubhouse-server - community club HTTP service
//!
//! Serves the JSON API, runs the weekly book-club scheduler and the
//! notification worker, and shuts all three down on Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use clubhouse_common::api::TokenSigner;
use clubhouse_common::config::{config_path_from_env, TomlConfig};
use clubhouse_common::db::init_database;
use clubhouse_server::api::admin::bootstrap_admin;
use clubhouse_server::bookclub::ProgressionEngine;
use clubhouse_server::logging;
use clubhouse_server::notify::{
    mailer_from_config, push_from_config, DispatchSettings, NotificationQueue, NotificationWorker,
};
use clubhouse_server::scheduler::{run_weekly, WeeklySchedule};
use clubhouse_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "clubhouse-server")]
#[command(about = "Community club service with weekly book-club notifications")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CLUBHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen port
    #[arg(short, long, env = "CLUBHOUSE_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "CLUBHOUSE_DATABASE")]
    database: Option<PathBuf>,

    /// Serve the API without the weekly advance trigger
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = logging::init();

    info!(
        "Starting clubhouse-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config_path = args.config.clone().or_else(config_path_from_env);
    let mut config = TomlConfig::load(config_path.as_deref())
        .with_context(|| "Failed to load configuration")?;
    logging::apply_config_level(&log_level, &config.logging.level);

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(path) = args.database {
        config.database.path = Some(path);
    }

    let db_path = config.database.resolved_path();
    info!("Database path: {}", db_path.display());
    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    bootstrap_admin(&db, config.auth.bootstrap_admin_email.as_deref())
        .await
        .context("Failed to apply bootstrap admin")?;

    let schedule = WeeklySchedule::from_config(&config.schedule)?;
    let (queue, rx) = NotificationQueue::channel(config.notifications.queue_capacity);
    let engine = Arc::new(ProgressionEngine::new(db.clone(), queue, schedule.offset()));

    let mailer = mailer_from_config(&config.email)?;
    let push = push_from_config(&config.push)?;
    let worker = NotificationWorker::new(
        rx,
        db.clone(),
        mailer.clone(),
        push,
        DispatchSettings::from(&config.notifications),
    );

    let cancel = CancellationToken::new();
    let worker_task = tokio::spawn(worker.run(cancel.clone()));

    let scheduler_task = if config.schedule.enabled && !args.no_scheduler {
        Some(tokio::spawn(run_weekly(engine.clone(), schedule, cancel.clone())))
    } else {
        info!("Weekly scheduler disabled");
        None
    };

    let tokens = TokenSigner::new(&config.auth.jwt_secret)
        .with_session_ttl(Duration::hours(config.auth.session_ttl_hours));
    let state = AppState::new(db, tokens, engine, mailer, config.server.frontend_url.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("clubhouse-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Some(task) = scheduler_task {
        let _ = task.await;
    }
    let _ = worker_task.await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
