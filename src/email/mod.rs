pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::health::Notifier;
use crate::models::Integration;
use crate::store::IntegrationStore;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay is not configured")]
    Unconfigured,
    #[error("{0}")]
    Transport(String),
}

/// Hands a composed message to the mail relay.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP relay error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}

/// Stand-in used when no SMTP relay is configured.
pub struct UnconfiguredMailer;

#[async_trait]
impl Mailer for UnconfiguredMailer {
    async fn send(&self, _message: Message) -> Result<(), MailError> {
        Err(MailError::Unconfigured)
    }
}

/// Emails the form owner when the breaker disables one of their integrations.
pub struct MailNotifier {
    integrations: Arc<dyn IntegrationStore>,
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl MailNotifier {
    pub fn new(
        integrations: Arc<dyn IntegrationStore>,
        mailer: Arc<dyn Mailer>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            integrations,
            mailer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn integration_disabled(&self, integration: &Integration) -> Result<(), String> {
        let owner = self
            .integrations
            .owner_contact(&integration.form_id)
            .await
            .map_err(|e| format!("Failed to load form owner: {e}"))?
            .ok_or_else(|| format!("Form {} has no owner email", integration.form_id))?;

        let destination = integration.integration_type.display_name();
        let html = templates::render_integration_disabled(destination, &owner.form_name)?;

        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(owner
                .email
                .parse()
                .map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(format!("Your {destination} integration was disabled"))
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.mailer.send(message).await.map_err(|e| e.to_string())
    }
}
