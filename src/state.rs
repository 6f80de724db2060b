use std::sync::Arc;

use dashmap::DashMap;

use crate::config::Config;
use crate::db::{event_log_repository::EventLogRepository, signup_repository::SignupRepository};
use crate::services::maintenance::MaintenanceService;
use crate::services::smtp_mailer::Mailer;
use crate::services::waitlist::{EmailLocks, WaitlistService};

#[derive(Clone)]
pub struct AppState {
    pub waitlist: WaitlistService,
    pub maintenance: MaintenanceService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires both services over the same stores and the same per-email lock map.
    pub fn new(
        signups: Arc<dyn SignupRepository>,
        events: Arc<dyn EventLogRepository>,
        mailer: Arc<dyn Mailer>,
        config: Arc<Config>,
    ) -> Self {
        let locks: EmailLocks = Arc::new(DashMap::new());
        Self {
            waitlist: WaitlistService::new(
                signups.clone(),
                events.clone(),
                mailer.clone(),
                config.clone(),
                locks.clone(),
            ),
            maintenance: MaintenanceService::new(signups, events, mailer, config.clone(), locks),
            config,
        }
    }
}
