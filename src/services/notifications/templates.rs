//! HTML bodies for the three customer emails, rendered from the askama
//! templates under `templates/email/`. Pure functions of their input.

use askama::Template;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::BusinessContact;
use crate::models::{AcType, ServiceKind};

/// Appointment facts quoted back to the customer.
#[derive(Debug, Clone)]
pub struct AppointmentNotice<'a> {
    pub customer_name: &'a str,
    pub when: String,
    pub service: ServiceKind,
    pub quantity: u8,
    pub item_name: Option<&'a str>,
    pub ac_type: AcType,
}

/// "Monday, June 16, 2025 at 9:00 AM" in the business timezone.
pub fn format_schedule_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .format("%A, %B %-d, %Y at %-I:%M %p")
        .to_string()
}

#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeEmail<'a> {
    business_name: &'a str,
    code: &'a str,
    valid_minutes: u64,
}

#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationEmail<'a> {
    business_name: &'a str,
    customer_name: &'a str,
    rows: Vec<(&'static str, String)>,
    links: Vec<(&'static str, String)>,
}

#[derive(Template)]
#[template(path = "email/cancellation.html")]
struct CancellationEmail<'a> {
    business_name: &'a str,
    customer_name: &'a str,
    rows: Vec<(&'static str, String)>,
    links: Vec<(&'static str, String)>,
}

pub fn verification_code_email(
    code: &str,
    valid_minutes: u64,
    business: &BusinessContact,
) -> askama::Result<String> {
    VerificationCodeEmail {
        business_name: &business.name,
        code,
        valid_minutes,
    }
    .render()
}

pub fn confirmation_email(
    notice: &AppointmentNotice<'_>,
    business: &BusinessContact,
) -> askama::Result<String> {
    ConfirmationEmail {
        business_name: &business.name,
        customer_name: notice.customer_name,
        rows: detail_rows(notice),
        links: contact_links(business),
    }
    .render()
}

pub fn cancellation_email(
    notice: &AppointmentNotice<'_>,
    business: &BusinessContact,
) -> askama::Result<String> {
    CancellationEmail {
        business_name: &business.name,
        customer_name: notice.customer_name,
        rows: detail_rows(notice),
        links: contact_links(business),
    }
    .render()
}

fn detail_rows(notice: &AppointmentNotice<'_>) -> Vec<(&'static str, String)> {
    // A linked unit replaces the AC type row.
    let unit_row = match notice.item_name {
        Some(name) => ("Item:", name.to_string()),
        None => ("AC Type:", notice.ac_type.display_name().to_string()),
    };
    vec![
        ("Time:", notice.when.clone()),
        ("Service:", notice.service.display_name().to_string()),
        unit_row,
        ("Quantity:", notice.quantity.to_string()),
    ]
}

fn contact_links(business: &BusinessContact) -> Vec<(&'static str, String)> {
    let mut links = Vec::new();
    if !business.phone.is_empty() {
        links.push(("Phone", format!("tel:{}", business.phone)));
    }
    if !business.email.is_empty() {
        links.push(("E-Mail", format!("mailto:{}", business.email)));
    }
    if let Some(url) = &business.facebook_url {
        links.push(("Facebook", url.clone()));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn business() -> BusinessContact {
        BusinessContact {
            name: "Pampy's Aircon".to_string(),
            phone: "+639324156997".to_string(),
            email: "shop@example.com".to_string(),
            facebook_url: None,
        }
    }

    fn notice(item_name: Option<&str>) -> AppointmentNotice<'_> {
        AppointmentNotice {
            customer_name: "Ana <script>",
            when: "Monday, June 16, 2025 at 9:00 AM".to_string(),
            service: ServiceKind::Installation,
            quantity: 2,
            item_name,
            ac_type: AcType::Window,
        }
    }

    #[test]
    fn test_format_schedule_time() {
        let at = Utc.with_ymd_and_hms(2025, 6, 16, 1, 0, 0).unwrap();
        assert_eq!(
            format_schedule_time(at, chrono_tz::Asia::Manila),
            "Monday, June 16, 2025 at 9:00 AM"
        );
        let afternoon = Utc.with_ymd_and_hms(2025, 6, 16, 7, 0, 0).unwrap();
        assert_eq!(
            format_schedule_time(afternoon, chrono_tz::Asia::Manila),
            "Monday, June 16, 2025 at 3:00 PM"
        );
    }

    #[test]
    fn test_code_email() {
        let html = verification_code_email("042917", 5, &business()).unwrap();
        assert!(html.contains("id=\"verification-code\""));
        assert!(html.contains(">042917</div>"));
        assert!(html.contains("valid for 5 minutes"));
        assert!(html.contains("Pampy"));
        assert!(!html.contains("Pampy's Aircon"));
    }

    #[test]
    fn test_confirmation_shows_ac_type_without_item() {
        let html = confirmation_email(&notice(None), &business()).unwrap();
        assert!(html.contains("Your schedule is confirmed!"));
        assert!(html.contains("AC Type:"));
        assert!(html.contains("Window"));
        assert!(html.contains("Installation"));
        assert!(html.contains("<td>2</td>"));
        assert!(html.contains("Ana &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("tel:+639324156997"));
        assert!(!html.contains("Facebook"));
    }

    #[test]
    fn test_cancellation_shows_item_name() {
        let html = cancellation_email(&notice(Some("Carrier 1.5HP")), &business()).unwrap();
        assert!(html.contains("has been cancelled"));
        assert!(html.contains("Item:"));
        assert!(html.contains("Carrier 1.5HP"));
        assert!(!html.contains("AC Type:"));
    }

    #[test]
    fn test_footer_omitted_without_contacts() {
        let bare = BusinessContact {
            name: "Shop".to_string(),
            phone: String::new(),
            email: String::new(),
            facebook_url: None,
        };
        assert!(!confirmation_email(&notice(None), &bare).unwrap().contains("reach out"));
    }
}
