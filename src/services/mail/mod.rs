pub mod smtp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the mail server said about a message it accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// SMTP reply code; 250 means queued for delivery.
    pub status: u16,
    pub response: String,
}

impl DeliveryReceipt {
    pub fn is_delivered(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<DeliveryReceipt>;
}
