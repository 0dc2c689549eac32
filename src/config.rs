use std::env;
use std::fmt;

use chrono_tz::Tz;

const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Manila;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Slot hours and calendar days are interpreted in this zone.
    pub timezone: Tz,
    pub smtp: SmtpSettings,
    pub business: BusinessContact,
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// `false` connects with implicit TLS (port 465 style).
    pub starttls: bool,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("from", &self.from)
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// Shown in the footer of every customer email.
#[derive(Clone, Debug)]
pub struct BusinessContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub facebook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "scheduler.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            timezone: parse_timezone(env::var("BUSINESS_TIMEZONE").ok().as_deref()),
            smtp: SmtpSettings {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(465),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string()),
                starttls: env::var("SMTP_STARTTLS")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
            business: BusinessContact {
                name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Aircon Services".to_string()),
                phone: env::var("BUSINESS_PHONE").unwrap_or_default(),
                email: env::var("BUSINESS_EMAIL").unwrap_or_default(),
                facebook_url: env::var("BUSINESS_FACEBOOK_URL").ok().filter(|v| !v.is_empty()),
            },
        }
    }
}

fn parse_timezone(raw: Option<&str>) -> Tz {
    match raw {
        None => DEFAULT_TIMEZONE,
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = name, "unknown BUSINESS_TIMEZONE, using {DEFAULT_TIMEZONE}");
            DEFAULT_TIMEZONE
        }),
    }
}
