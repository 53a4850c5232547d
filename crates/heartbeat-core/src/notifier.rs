//! Push notification delivery.

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::notification::{Notification, NotificationKind};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{error, info};

const MAX_MESSAGE_CHARS: usize = 1024;
const MAX_TITLE_CHARS: usize = 250;

/// Something that can deliver a rendered notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Delivers notifications through the Pushover messages API.
#[derive(Clone)]
pub struct PushoverNotifier {
    config: NotifyConfig,
    http_client: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(config: NotifyConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("heartbeat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn token_for(&self, kind: NotificationKind) -> &str {
        match kind {
            NotificationKind::Report => &self.config.report_token,
            NotificationKind::Alert => &self.config.alert_token,
        }
    }

    fn build_form(&self, notification: &Notification) -> Result<Form, NotifyError> {
        let mut form = Form::new()
            .text("token", self.token_for(notification.kind).to_string())
            .text("user", self.config.recipient.clone())
            .text("title", truncate(&notification.title, MAX_TITLE_CHARS))
            .text("message", truncate(&notification.message, MAX_MESSAGE_CHARS));

        if let Some(attachment) = &notification.attachment {
            let part = Part::bytes(attachment.bytes.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.mime_type)
                .map_err(|e| NotifyError::Attachment(e.to_string()))?;
            form = form.part("attachment", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let form = self.build_form(notification)?;

        let response = self
            .http_client
            .post(&self.config.api_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                kind = ?notification.kind,
                "Pushover rejected notification with status {}: {}", status, body
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(kind = ?notification.kind, title = %notification.title, "Notification sent");
        Ok(())
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Attachment;
    use mockito::Matcher;

    fn config(api_url: String) -> NotifyConfig {
        NotifyConfig {
            api_url,
            report_token: "report-token".to_string(),
            alert_token: "alert-token".to_string(),
            user_token: "user-token".to_string(),
            recipient: "group-token".to_string(),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "x".repeat(2000);
        let cut = truncate(&long, MAX_MESSAGE_CHARS);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);
        assert!(cut.ends_with('…'));
    }

    #[tokio::test]
    async fn test_alert_uses_alert_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/1/messages.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("alert-token".to_string()),
                Matcher::Regex("group-token".to_string()),
                Matcher::Regex("Hotspot went quiet".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":1,"request":"abc"}"#)
            .create_async()
            .await;

        let notifier = PushoverNotifier::new(
            config(format!("{}/1/messages.json", server.url())),
            Duration::from_secs(5),
        )
        .unwrap();
        let notification = Notification::new(
            NotificationKind::Alert,
            "Hotspot Status has Changed",
            "Hotspot went quiet".to_string(),
        );

        notifier.send(&notification).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_report_with_attachment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/1/messages.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("report-token".to_string()),
                Matcher::Regex("heartbeats.svg".to_string()),
                Matcher::Regex("image/svg\\+xml".to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let notifier = PushoverNotifier::new(
            config(format!("{}/1/messages.json", server.url())),
            Duration::from_secs(5),
        )
        .unwrap();
        let notification = Notification::new(
            NotificationKind::Report,
            "Inactive Block Chart",
            "chart".to_string(),
        )
        .with_attachment(Attachment {
            file_name: "heartbeats.svg".to_string(),
            mime_type: "image/svg+xml".to_string(),
            bytes: b"<svg></svg>".to_vec(),
        });

        notifier.send(&notification).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/1/messages.json")
            .with_status(400)
            .with_body(r#"{"token":"invalid","status":0}"#)
            .create_async()
            .await;

        let notifier = PushoverNotifier::new(
            config(format!("{}/1/messages.json", server.url())),
            Duration::from_secs(5),
        )
        .unwrap();
        let notification =
            Notification::new(NotificationKind::Report, "Timely Update", "hi".to_string());

        match notifier.send(&notification).await {
            Err(NotifyError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
