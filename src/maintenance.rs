use crate::error::AppResult;
use crate::models::utc_now;
use crate::repositories::{AppointmentRepository, PharmacyRepository, UserRepository};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// What one housekeeping pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub no_shows: u64,
    pub purged_otps: u64,
    pub low_stock: i64,
}

/// Slots that ended before this instant count as missed
pub fn no_show_cutoff(now: NaiveDateTime, grace_minutes: i64) -> NaiveDateTime {
    now - ChronoDuration::minutes(grace_minutes.max(0))
}

/// Background task for periodic housekeeping
///
/// Each pass marks missed appointments as no-shows, purges used or expired
/// OTP codes and warns about medicines at their reorder level.
pub struct MaintenanceWorker {
    appointments: Arc<AppointmentRepository>,
    users: Arc<UserRepository>,
    pharmacy: Arc<PharmacyRepository>,
    interval: Duration,
    no_show_grace_minutes: i64,
}

impl MaintenanceWorker {
    pub fn new(
        appointments: Arc<AppointmentRepository>,
        users: Arc<UserRepository>,
        pharmacy: Arc<PharmacyRepository>,
    ) -> Self {
        Self {
            appointments,
            users,
            pharmacy,
            interval: Duration::from_secs(60),
            no_show_grace_minutes: 30,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_no_show_grace(mut self, minutes: i64) -> Self {
        self.no_show_grace_minutes = minutes;
        self
    }

    /// Run forever; a failed pass is logged and the next tick tries again
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!("Maintenance worker started, running every {:?}", self.interval);

        loop {
            interval.tick().await;

            match self.run_once(utc_now()).await {
                Ok(report) if report != MaintenanceReport::default() => {
                    info!(
                        "Maintenance pass: {} no-shows, {} OTPs purged, {} low-stock medicines",
                        report.no_shows, report.purged_otps, report.low_stock
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Maintenance pass failed: {}", e),
            }
        }
    }

    pub async fn run_once(&self, now: NaiveDateTime) -> AppResult<MaintenanceReport> {
        let no_shows = self
            .appointments
            .mark_no_shows(no_show_cutoff(now, self.no_show_grace_minutes))
            .await?;
        let purged_otps = self.users.purge_stale_otps(now).await?;
        let low_stock = self.pharmacy.count_low_stock().await?;

        if low_stock > 0 {
            warn!("{} medicines are at or below their reorder level", low_stock);
        }

        Ok(MaintenanceReport {
            no_shows,
            purged_otps,
            low_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_no_show_cutoff() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            no_show_cutoff(now, 30),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(11, 30, 0).unwrap()
        );
        assert_eq!(no_show_cutoff(now, -5), now);
    }
}
