use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::booking::BookingOrchestrator;
use crate::services::mail::MailSender;
use crate::services::notifications::Notifier;
use crate::services::sessions::SessionStore;
use crate::services::slot_policy::SlotPolicy;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub booking: BookingOrchestrator,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, conn: Connection, mailer: Arc<dyn MailSender>) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let notifier = Notifier::new(mailer, config.business.clone(), config.timezone);
        let booking = BookingOrchestrator::new(db.clone(), notifier, SlotPolicy::new(config.timezone));
        Self {
            db,
            config,
            booking,
            sessions: SessionStore::new(),
        }
    }
}
