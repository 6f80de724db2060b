use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::models::waitlist_event::ACTOR_SCHEDULER;
use crate::state::AppState;

/// Spawns the maintenance loop when `MAINTENANCE_INTERVAL_SECONDS` is non-zero.
pub async fn start_background_workers(state: AppState) {
    let seconds = state.config.maintenance_interval_seconds;
    if seconds == 0 {
        info!("maintenance worker disabled");
        return;
    }

    tokio::spawn(async move {
        let mut schedule = ReportSchedule::default();
        let mut ticker = interval(Duration::from_secs(seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_maintenance_pass(&state, &mut schedule).await;
        }
    });
    info!(interval_seconds = seconds, "maintenance worker started");
}

/// Tracks when the weekly report last went out so it is sent at most once
/// per week regardless of the maintenance interval.
#[derive(Debug, Default)]
pub struct ReportSchedule {
    last_sent: Option<OffsetDateTime>,
}

impl ReportSchedule {
    const PERIOD: time::Duration = time::Duration::days(7);

    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.last_sent
            .map_or(true, |sent| now - sent >= Self::PERIOD)
    }
}

pub async fn run_maintenance_pass(state: &AppState, schedule: &mut ReportSchedule) {
    match state.maintenance.cleanup_stale(None, ACTOR_SCHEDULER).await {
        Ok(report) => info!(removed = report.removed, "worker: stale cleanup complete"),
        Err(err) => error!(error = %err, "worker: stale cleanup failed"),
    }

    let now = OffsetDateTime::now_utc();
    if !schedule.is_due(now) {
        return;
    }
    match state.maintenance.deliver_weekly_report().await {
        Ok(_) => schedule.last_sent = Some(now),
        Err(err) => error!(error = %err, "worker: weekly report failed"),
    }
}
