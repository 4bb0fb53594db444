use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Message;

use super::{DeliveryReceipt, MailMeta};
use crate::email::{MailError, Mailer};
use crate::error::DeliveryError;

/// Sends rendered submission mails through the configured relay.
pub struct MailDelivery {
    mailer: Arc<dyn Mailer>,
}

impl MailDelivery {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub async fn deliver(&self, meta: &MailMeta, html: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let message = compose(meta, html)?;

        self.mailer.send(message).await.map_err(|e| match e {
            MailError::Unconfigured => {
                DeliveryError::Configuration("mail relay is not configured".to_string())
            }
            MailError::Transport(msg) => DeliveryError::Transient(msg),
        })?;

        Ok(DeliveryReceipt {
            destination: "mail".to_string(),
            reference: Some(meta.to.clone()),
            already_delivered: false,
        })
    }
}

/// Build the MIME message. `to` may list several comma-separated recipients.
pub fn compose(meta: &MailMeta, html: &str) -> Result<Message, DeliveryError> {
    let from: Mailbox = meta
        .from
        .parse()
        .map_err(|e| DeliveryError::Configuration(format!("Invalid from address: {e}")))?;

    let mut builder = Message::builder().from(from).subject(meta.subject.clone());

    let mut recipients = 0;
    for address in meta.to.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mailbox: Mailbox = address.parse().map_err(|e| {
            DeliveryError::Configuration(format!("Invalid to address '{address}': {e}"))
        })?;
        builder = builder.to(mailbox);
        recipients += 1;
    }
    if recipients == 0 {
        return Err(DeliveryError::Configuration(
            "mail integration has no recipients".to_string(),
        ));
    }

    builder
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .map_err(|e| DeliveryError::Configuration(format!("Failed to build email: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(to: &str) -> MailMeta {
        MailMeta {
            from: "forms@example.com".into(),
            to: to.into(),
            subject: "New response".into(),
            body: String::new(),
            is_dynamic_body: false,
        }
    }

    #[test]
    fn composes_message_for_every_recipient() {
        let message = compose(&meta("a@example.com, b@example.com"), "<p>hi</p>").unwrap();
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn rejects_invalid_addresses() {
        assert!(matches!(
            compose(&meta("not-an-address"), "<p>hi</p>"),
            Err(DeliveryError::Configuration(_))
        ));
        assert!(matches!(
            compose(&meta(" , "), "<p>hi</p>"),
            Err(DeliveryError::Configuration(_))
        ));
    }
}
