use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when dispatching a notification
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Notification service rejected request: {0}")]
    Rejected(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Outbound notifications fired after an auto-assignment
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_contractor_assigned(
        &self,
        contractor_id: &str,
        project_id: &str,
    ) -> Result<(), NotificationError>;

    async fn notify_client_assigned(
        &self,
        client_id: &str,
        contractor_id: &str,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Contractor,
    Client,
}

/// Notification document posted to the notification service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "recipientId")]
    pub recipient_id: String,
    #[serde(rename = "recipientType")]
    pub recipient_type: RecipientType,
    pub template: String,
    pub data: serde_json::Value,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl NotificationRecord {
    fn new(
        recipient_id: &str,
        recipient_type: RecipientType,
        template: &str,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            recipient_type,
            template: template.to_string(),
            data,
            created_at: chrono::Utc::now(),
        }
    }
}

pub const CONTRACTOR_ASSIGNMENT_TEMPLATE: &str = "contractor_assignment";
pub const CLIENT_ASSIGNMENT_TEMPLATE: &str = "client_assignment";

/// HTTP client for the notification service
pub struct HttpNotifier {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpNotifier {
    /// Create a new notifier; `timeout` bounds each request
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    async fn send(&self, record: NotificationRecord) -> Result<(), NotificationError> {
        let url = format!("{}/notifications", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::warn!("Notification {} to {} rejected: {} - {}", record.template, record.recipient_id, status, body);
            return Err(NotificationError::Rejected(format!(
                "{} returned {}",
                record.template, status
            )));
        }

        tracing::debug!("Sent {} notification to {}", record.template, record.recipient_id);

        Ok(())
    }
}

#[async_trait]
impl NotificationSink for HttpNotifier {
    async fn notify_contractor_assigned(
        &self,
        contractor_id: &str,
        project_id: &str,
    ) -> Result<(), NotificationError> {
        self.send(NotificationRecord::new(
            contractor_id,
            RecipientType::Contractor,
            CONTRACTOR_ASSIGNMENT_TEMPLATE,
            json!({ "projectId": project_id }),
        ))
        .await
    }

    async fn notify_client_assigned(
        &self,
        client_id: &str,
        contractor_id: &str,
    ) -> Result<(), NotificationError> {
        self.send(NotificationRecord::new(
            client_id,
            RecipientType::Client,
            CLIENT_ASSIGNMENT_TEMPLATE,
            json!({ "contractorId": contractor_id }),
        ))
        .await
    }
}

/// Notifier that only logs; used when no notification endpoint is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_contractor_assigned(
        &self,
        contractor_id: &str,
        project_id: &str,
    ) -> Result<(), NotificationError> {
        tracing::info!("Contractor {} assigned to project {}", contractor_id, project_id);
        Ok(())
    }

    async fn notify_client_assigned(
        &self,
        client_id: &str,
        contractor_id: &str,
    ) -> Result<(), NotificationError> {
        tracing::info!("Client {} notified of contractor {}", client_id, contractor_id);
        Ok(())
    }
}
