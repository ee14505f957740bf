use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailSettings;
use crate::error::RemoteError;

pub const SUCCESS_SUBJECT: &str = "NFL Pipeline Success";
pub const FAILURE_SUBJECT: &str = "NFL Pipeline Failure";

/// One-shot plain-text notifications about a run's outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), RemoteError>;
}

pub struct SmtpNotifier {
    settings: EmailSettings,
}

impl SmtpNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), RemoteError> {
        let from: Mailbox = self
            .settings
            .sender
            .parse()
            .map_err(|e| RemoteError::Mail(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = self
            .settings
            .receiver
            .parse()
            .map_err(|e| RemoteError::Mail(format!("invalid receiver address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| RemoteError::Mail(e.to_string()))?;

        let credentials =
            Credentials::new(self.settings.sender.clone(), self.settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.smtp_host)
            .map_err(|e| RemoteError::Mail(e.to_string()))?
            .credentials(credentials)
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| RemoteError::Mail(e.to_string()))?;

        tracing::info!("Email sent to {}: {}", self.settings.receiver, subject);
        Ok(())
    }
}

pub fn success_body(summary: &str) -> String {
    format!("The NFL pipeline completed successfully.\n\n{}", summary)
}

pub fn failure_body(error: &str, summary: &str) -> String {
    format!("The NFL pipeline failed.\n\nError: {}\n\n{}", error, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_body_includes_error() {
        let body = failure_body("stats: no stat pages scraped", "Duration: 3.20s");
        assert!(body.contains("Error: stats: no stat pages scraped"));
        assert!(body.contains("Duration: 3.20s"));
    }

    #[test]
    fn test_success_body() {
        assert!(success_body("Duration: 1.00s").starts_with("The NFL pipeline completed successfully."));
    }
}
