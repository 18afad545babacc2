//! Push broadcast transports

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{DispatchError, PushBroadcaster, PushMessage};

const USER_AGENT: &str = concat!("clubhouse/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct LocalizedText<'a> {
    en: &'a str,
}

#[derive(Serialize)]
struct NotificationRequest<'a> {
    app_id: &'a str,
    included_segments: [&'a str; 1],
    headings: LocalizedText<'a>,
    contents: LocalizedText<'a>,
}

/// OneSignal "create notification" client
pub struct OneSignalPush {
    http_client: reqwest::Client,
    api_url: String,
    app_id: String,
    api_key: String,
}

impl OneSignalPush {
    pub fn new(api_url: String, app_id: String, api_key: String) -> Result<Self, DispatchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url,
            app_id,
            api_key,
        })
    }
}

#[async_trait]
impl PushBroadcaster for OneSignalPush {
    async fn broadcast(&self, message: &PushMessage) -> Result<(), DispatchError> {
        let body = NotificationRequest {
            app_id: &self.app_id,
            included_segments: ["All"],
            headings: LocalizedText { en: &message.heading },
            contents: LocalizedText { en: &message.content },
        };

        debug!(heading = %message.heading, "Sending push broadcast");

        let response = self
            .http_client
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DispatchError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DispatchError::Api(status.as_u16(), error_text));
        }

        Ok(())
    }
}

/// Writes broadcasts to the log instead of sending them
pub struct LogPush;

#[async_trait]
impl PushBroadcaster for LogPush {
    async fn broadcast(&self, message: &PushMessage) -> Result<(), DispatchError> {
        info!(
            heading = %message.heading,
            content = %message.content,
            "Push not sent (no transport configured)"
        );
        Ok(())
    }
}
