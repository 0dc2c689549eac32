use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryReceipt, MailSender};
use crate::config::SmtpSettings;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        }
        .with_context(|| format!("failed to configure SMTP relay {}", settings.host))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        let from = settings
            .from
            .parse()
            .with_context(|| format!("invalid sender address: {}", settings.from))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_mail(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<DeliveryReceipt> {
        let recipient: Mailbox = to
            .parse()
            .with_context(|| format!("invalid recipient address: {to}"))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("failed to build email")?;

        let response = self
            .transport
            .send(message)
            .await
            .context("failed to send email over SMTP")?;

        let status = response
            .code()
            .to_string()
            .parse()
            .context("SMTP server returned a malformed reply code")?;

        Ok(DeliveryReceipt {
            status,
            response: response.first_line().unwrap_or_default().to_string(),
        })
    }
}
