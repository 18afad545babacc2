//! Recording transports
//!
//! Stand-ins for the email and push APIs. Each records what it was asked
//! to send and can be told to fail a number of times first.

use async_trait::async_trait;
use clubhouse_server::notify::{DispatchError, EmailMessage, Mailer, PushBroadcaster, PushMessage};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    attempts: AtomicU32,
    failures_left: AtomicU32,
}

impl RecordingMailer {
    /// Fail the next `n` sends with a network error
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Most recent message addressed to `email`
    pub fn last_to(&self, email: &str) -> Option<EmailMessage> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to.iter().any(|to| to == email))
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.failures_left) {
            return Err(DispatchError::Network("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushMessage>>,
    failures_left: AtomicU32,
}

impl RecordingPush {
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushBroadcaster for RecordingPush {
    async fn broadcast(&self, message: &PushMessage) -> Result<(), DispatchError> {
        if take_failure(&self.failures_left) {
            return Err(DispatchError::Api(503, "unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
