use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::{GatewayError, GatewayResult};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Remote attachment, fetched by the email provider from `url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(rename = "path")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

/// Outbound email delivery. Failures are reported, never retried here.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> GatewayResult<()>;
}

/// Sends through the Resend HTTP API.
pub struct ResendMailer {
    api_key: String,
    from: String,
    client: Client,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self { api_key, from, client: Client::new() }
    }
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "no_attachments")]
    attachments: &'a [Attachment],
}

fn no_attachments(attachments: &&[Attachment]) -> bool {
    attachments.is_empty()
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: Email) -> GatewayResult<()> {
        let payload = ResendPayload {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html_body,
            attachments: &email.attachments,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Rejected(format!("Resend API error ({}): {}", status, body)));
        }

        debug!("Email accepted by provider");
        Ok(())
    }
}

/// Fallback when no provider is configured: logs instead of sending.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> GatewayResult<()> {
        info!(to = %email.to, subject = %email.subject, "Email delivery disabled; message logged only");
        Ok(())
    }
}
