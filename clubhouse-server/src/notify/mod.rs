//! Weekly reading notifications
//!
//! The progression engine only enqueues an [`Announcement`]; the
//! [`NotificationWorker`] owns delivery. For each announcement the worker
//! reads the member list, sends the reading email in bounded batches and
//! sends one push broadcast. Transport failures are retried and finally
//! logged; they never feed back into book-club state.

pub mod email;
pub mod push;

use async_trait::async_trait;
use clubhouse_common::config::{EmailConfig, NotificationConfig, PushConfig};
use clubhouse_common::{Error, Result};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::users::list_member_emails;

pub use email::{HttpMailer, LogMailer};
pub use push::{LogPush, OneSignalPush};

/// Transport failures
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// One outbound email, possibly to many recipients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// One broadcast to every push subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub heading: String,
    pub content: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<(), DispatchError>;
}

#[async_trait]
pub trait PushBroadcaster: Send + Sync {
    async fn broadcast(&self, message: &PushMessage) -> std::result::Result<(), DispatchError>;
}

/// Mailer for `[email]`, or a logging stand-in when it is incomplete
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match (&config.api_url, &config.api_key, &config.from) {
        (Some(url), Some(key), Some(from)) => {
            let mailer = HttpMailer::new(url.clone(), key.clone(), from.clone())
                .map_err(|e| Error::Config(format!("Email client: {}", e)))?;
            info!(api_url = %url, "Email delivery enabled");
            Ok(Arc::new(mailer))
        }
        _ => {
            warn!("Email API not configured; emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Push broadcaster for `[push]`, or a logging stand-in
pub fn push_from_config(config: &PushConfig) -> Result<Arc<dyn PushBroadcaster>> {
    match (&config.app_id, &config.api_key) {
        (Some(app_id), Some(key)) => {
            let push = OneSignalPush::new(config.api_url.clone(), app_id.clone(), key.clone())
                .map_err(|e| Error::Config(format!("Push client: {}", e)))?;
            info!("Push delivery enabled");
            Ok(Arc::new(push))
        }
        _ => {
            warn!("Push API not configured; broadcasts will only be logged");
            Ok(Arc::new(LogPush))
        }
    }
}

/// Emitted once per successful advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub cycle_id: String,
    pub title: String,
    pub week: u32,
    pub chapter_label: String,
}

impl Announcement {
    pub fn email(&self, recipients: Vec<String>, meeting_note: &str) -> EmailMessage {
        let reading = format!("This week's reading is: {}", self.chapter_label);
        EmailMessage {
            to: recipients,
            subject: format!("Book Club Week {}: {}", self.week, self.title),
            text: format!("{}\n\n{}", reading, meeting_note),
            html: format!(
                "<p>{}</p><p>{}</p>",
                html_escape::encode_text(&reading),
                html_escape::encode_text(meeting_note)
            ),
        }
    }

    pub fn push(&self) -> PushMessage {
        PushMessage {
            heading: format!("Week {}: {}", self.week, self.title),
            content: format!("This week's chapters: {}", self.chapter_label),
        }
    }
}

/// Sending side of the announcement queue
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Announcement>,
}

impl NotificationQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Announcement>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue without waiting; fails when full or when the worker is gone
    pub fn enqueue(&self, announcement: Announcement) -> Result<()> {
        self.tx.try_send(announcement).map_err(|e| match e {
            mpsc::error::TrySendError::Full(a) => Error::Dispatch(format!(
                "Notification queue full, dropped week {} of cycle {}",
                a.week, a.cycle_id
            )),
            mpsc::error::TrySendError::Closed(a) => Error::Dispatch(format!(
                "Notification worker stopped, dropped week {} of cycle {}",
                a.week, a.cycle_id
            )),
        })
    }
}

/// Worker tuning, from `[notifications]`
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub email_batch_size: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub meeting_note: String,
}

impl From<&NotificationConfig> for DispatchSettings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            email_batch_size: config.email_batch_size,
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            meeting_note: config.meeting_note.clone(),
        }
    }
}

/// Result of fanning out one announcement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipients: usize,
    pub email_batches_sent: usize,
    pub email_batches_failed: usize,
    pub push_sent: bool,
}

/// Consumes announcements until every queue handle is dropped
pub struct NotificationWorker {
    rx: mpsc::Receiver<Announcement>,
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
    push: Arc<dyn PushBroadcaster>,
    settings: DispatchSettings,
}

impl NotificationWorker {
    pub fn new(
        rx: mpsc::Receiver<Announcement>,
        db: SqlitePool,
        mailer: Arc<dyn Mailer>,
        push: Arc<dyn PushBroadcaster>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            rx,
            db,
            mailer,
            push,
            settings,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Notification worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Notification worker cancelled");
                    break;
                }
                next = self.rx.recv() => {
                    let Some(announcement) = next else {
                        debug!("Notification queue closed");
                        break;
                    };
                    if let Err(e) = self.deliver(&announcement).await {
                        error!(
                            cycle_id = %announcement.cycle_id,
                            week = announcement.week,
                            error = %e,
                            "Weekly notification failed"
                        );
                    }
                }
            }
        }

        info!("Notification worker stopped");
    }

    /// Send the email batches and the push broadcast for one announcement
    ///
    /// Only the recipient lookup can fail; send failures are counted in the
    /// report after retries are exhausted.
    pub async fn deliver(&self, announcement: &Announcement) -> Result<DeliveryReport> {
        let recipients = list_member_emails(&self.db).await?;
        let mut report = DeliveryReport {
            recipients: recipients.len(),
            ..DeliveryReport::default()
        };

        let batch_size = self.settings.email_batch_size.max(1);
        for (index, batch) in recipients.chunks(batch_size).enumerate() {
            let message = announcement.email(batch.to_vec(), &self.settings.meeting_note);
            let sent = retry_send("weekly email", &self.settings, || self.mailer.send(&message)).await;

            match sent {
                Ok(()) => report.email_batches_sent += 1,
                Err(e) => {
                    report.email_batches_failed += 1;
                    error!(
                        cycle_id = %announcement.cycle_id,
                        week = announcement.week,
                        batch = index,
                        recipients = batch.len(),
                        error = %e,
                        "Email batch dropped"
                    );
                }
            }
        }

        let push = announcement.push();
        match retry_send("push broadcast", &self.settings, || self.push.broadcast(&push)).await {
            Ok(()) => report.push_sent = true,
            Err(e) => error!(
                cycle_id = %announcement.cycle_id,
                week = announcement.week,
                error = %e,
                "Push broadcast dropped"
            ),
        }

        info!(
            cycle_id = %announcement.cycle_id,
            week = announcement.week,
            recipients = report.recipients,
            batches_sent = report.email_batches_sent,
            batches_failed = report.email_batches_failed,
            push_sent = report.push_sent,
            "Weekly notification delivered"
        );

        Ok(report)
    }
}

/// Run `send` up to `max_attempts` times, sleeping `retry_delay` in between
async fn retry_send<F, Fut>(
    operation: &str,
    settings: &DispatchSettings,
    mut send: F,
) -> std::result::Result<(), DispatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), DispatchError>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match send().await {
            Ok(()) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Send succeeded after retry");
                }
                return Ok(());
            }
            // A rejected key will not fix itself
            Err(DispatchError::InvalidApiKey) => return Err(DispatchError::InvalidApiKey),
            Err(e) if attempt >= max_attempts => {
                warn!(operation, attempt, error = %e, "Send failed, giving up");
                return Err(e);
            }
            Err(e) => {
                warn!(operation, attempt, max_attempts, error = %e, "Send failed, retrying");
                tokio::time::sleep(settings.retry_delay).await;
            }
        }
    }
}
