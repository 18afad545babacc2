//! clubhouse-advance - run the weekly book-club advance once
//!
//! For deployments that trigger the advance from an external cron instead
//! of the server's built-in scheduler. Delivers the resulting notification
//! before exiting.

use anyhow::{Context, Result};
use clap::Parser;
use clubhouse_common::config::{config_path_from_env, TomlConfig};
use clubhouse_common::db::init_database;
use clubhouse_server::bookclub::{AdvanceOutcome, ProgressionEngine};
use clubhouse_server::logging;
use clubhouse_server::notify::{
    mailer_from_config, push_from_config, DispatchSettings, NotificationQueue, NotificationWorker,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "clubhouse-advance")]
#[command(about = "Advance the book club by one week and notify members")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CLUBHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "CLUBHOUSE_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = logging::init();

    info!(
        "Starting clubhouse-advance v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config_path = args.config.clone().or_else(config_path_from_env);
    let mut config = TomlConfig::load(config_path.as_deref())
        .with_context(|| "Failed to load configuration")?;
    logging::apply_config_level(&log_level, &config.logging.level);

    if let Some(path) = args.database {
        config.database.path = Some(path);
    }
    let db_path = config.database.resolved_path();
    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let offset = config.schedule.offset()?;
    let (queue, rx) = NotificationQueue::channel(config.notifications.queue_capacity);
    let worker = NotificationWorker::new(
        rx,
        db.clone(),
        mailer_from_config(&config.email)?,
        push_from_config(&config.push)?,
        DispatchSettings::from(&config.notifications),
    );
    let worker_task = tokio::spawn(worker.run(CancellationToken::new()));

    let engine = ProgressionEngine::new(db, queue, offset);
    let outcome = engine.advance_week().await?;
    match &outcome {
        AdvanceOutcome::Advanced { week, chapter_label, .. } => {
            info!(week, chapter = %chapter_label, "Advanced book club week");
        }
        other => info!(outcome = ?other, "No advance performed"),
    }

    // Dropping the engine drops the last queue handle, so the worker drains and exits
    drop(engine);
    worker_task.await.context("Notification worker panicked")?;

    Ok(())
}
