use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use log::{error, info};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

/// Shared connection pool for collaborator clients.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// Subject line used for every notice.
pub const MAIL_SUBJECT: &str = "Will Be There";

/// Messaging-service template ids.
pub const TEMPLATE_LOCATION_RELEASE: u32 = 8191;
pub const TEMPLATE_REMINDER: u32 = 3116;
pub const TEMPLATE_CANCELLATION: u32 = 8618;
pub const TEMPLATE_DETAIL_CHANGE: u32 = 4512;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Failed to send mail: {0}")]
    SendFailed(String),
}

/// Messaging collaborator. Fire-and-forget from the core's perspective:
/// callers log failures and carry on, they never surface them to users.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        recipients: &[String],
        template_id: u32,
        variables: &HashMap<String, String>,
    ) -> Result<(), MailerError>;
}

#[derive(Debug, Serialize)]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailPayload<'a> {
    from: MailAddress,
    to: Vec<MailAddress>,
    subject: &'a str,
    template_id: u32,
    variables: &'a HashMap<String, String>,
}

/// Transactional-mail client posting templated sends to the external
/// messaging service.
pub struct HttpMailer {
    client: Client,
    base_url: String,
    from_email: String,
    from_name: String,
}

impl HttpMailer {
    /// Reads `MAILER_URL`, `MAILER_FROM_EMAIL` and `MAILER_FROM_NAME`
    /// from the environment.
    pub fn from_env() -> Result<Self, MailerError> {
        let base_url = env::var("MAILER_URL")
            .map_err(|_| MailerError::SendFailed("MAILER_URL environment variable not set".into()))?;
        let from_email = env::var("MAILER_FROM_EMAIL")
            .unwrap_or_else(|_| "no-reply@willbethere.app".to_string());
        let from_name = env::var("MAILER_FROM_NAME").unwrap_or_else(|_| MAIL_SUBJECT.to_string());
        Ok(Self::with_client_and_base_url(
            HTTP_CLIENT.clone(),
            base_url,
            from_email,
            from_name,
        ))
    }

    pub fn with_client_and_base_url(
        client: Client,
        base_url: impl Into<String>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        subject: &str,
        recipients: &[String],
        template_id: u32,
        variables: &HashMap<String, String>,
    ) -> Result<(), MailerError> {
        if recipients.is_empty() {
            info!("No recipients provided, skipping mail dispatch");
            return Ok(());
        }

        let payload = MailPayload {
            from: MailAddress {
                email: self.from_email.clone(),
                name: Some(self.from_name.clone()),
            },
            to: recipients
                .iter()
                .map(|email| MailAddress {
                    email: email.clone(),
                    name: None,
                })
                .collect(),
            subject,
            template_id,
            variables,
        };

        info!(
            "Dispatching template {} to {} recipient(s)",
            template_id,
            recipients.len()
        );

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach messaging service: {}", e);
                MailerError::SendFailed(format!("Failed to reach messaging service: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Messaging service returned error status {}: {}",
                status, error_text
            );
            return Err(MailerError::SendFailed(format!(
                "Messaging service error: {} - {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
