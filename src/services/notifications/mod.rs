//! Renders customer emails and hands them to the mail collaborator. Failures
//! come back as [`BookingError::Delivery`] or [`BookingError::Template`];
//! whether that is fatal is the caller's call.

pub mod templates;

use std::sync::Arc;

use chrono_tz::Tz;

use crate::config::BusinessContact;
use crate::errors::BookingError;
use crate::models::Appointment;
use crate::services::mail::{DeliveryReceipt, MailSender};

use self::templates::AppointmentNotice;

pub const CODE_SUBJECT: &str = "Confirm your email!";
pub const CONFIRMATION_SUBJECT: &str = "Schedule Confirmation!";
pub const CANCELLATION_SUBJECT: &str = "Schedule Cancelled!";

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn MailSender>,
    business: BusinessContact,
    tz: Tz,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn MailSender>, business: BusinessContact, tz: Tz) -> Self {
        Self {
            mailer,
            business,
            tz,
        }
    }

    pub async fn send_code(
        &self,
        to: &str,
        code: &str,
        step_seconds: u64,
    ) -> Result<DeliveryReceipt, BookingError> {
        let html = templates::verification_code_email(code, step_seconds / 60, &self.business)
            .map_err(template_failure)?;
        self.deliver(to, CODE_SUBJECT, &html).await
    }

    pub async fn send_confirmation(
        &self,
        appointment: &Appointment,
        item_name: Option<&str>,
    ) -> Result<DeliveryReceipt, BookingError> {
        let html = templates::confirmation_email(&self.notice(appointment, item_name), &self.business)
            .map_err(template_failure)?;
        self.deliver(&appointment.customer.email, CONFIRMATION_SUBJECT, &html)
            .await
    }

    pub async fn send_cancellation(
        &self,
        appointment: &Appointment,
        item_name: Option<&str>,
    ) -> Result<DeliveryReceipt, BookingError> {
        let html = templates::cancellation_email(&self.notice(appointment, item_name), &self.business)
            .map_err(template_failure)?;
        self.deliver(&appointment.customer.email, CANCELLATION_SUBJECT, &html)
            .await
    }

    fn notice<'a>(&self, appointment: &'a Appointment, item_name: Option<&'a str>) -> AppointmentNotice<'a> {
        AppointmentNotice {
            customer_name: &appointment.customer.name,
            when: templates::format_schedule_time(appointment.scheduled_at, self.tz),
            service: appointment.service,
            quantity: appointment.quantity,
            item_name,
            ac_type: appointment.ac_type,
        }
    }

    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, BookingError> {
        match self.mailer.send_mail(to, subject, html).await {
            Ok(receipt) if receipt.is_delivered() => {
                tracing::info!(to, subject, status = receipt.status, "email sent");
                Ok(receipt)
            }
            Ok(receipt) => {
                tracing::warn!(to, subject, status = receipt.status, response = %receipt.response, "mail server refused email");
                Err(BookingError::Delivery(format!(
                    "mail server replied {} {}",
                    receipt.status, receipt.response
                )))
            }
            Err(e) => {
                tracing::warn!(to, subject, error = %format!("{e:#}"), "email delivery failed");
                Err(BookingError::Delivery(format!("{e:#}")))
            }
        }
    }
}

fn template_failure(err: askama::Error) -> BookingError {
    tracing::error!(error = %err, "email template failed to render");
    BookingError::Template(err)
}
