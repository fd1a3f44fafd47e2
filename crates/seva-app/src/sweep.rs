//! Periodic auto-grant sweep. Attendance and bonus settlement already check
//! badges for the affected user; the sweep picks up engagement-duration
//! badges that fall due with nothing else happening.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use seva_db::db::DbProvider;
use seva_service::badge;
use tokio::task::JoinHandle;

pub struct BadgeSweeper {
    provider: Arc<dyn DbProvider + Send + Sync>,
    interval: Duration,
}

impl BadgeSweeper {
    #[must_use]
    pub fn new(provider: Arc<dyn DbProvider + Send + Sync>, interval: Duration) -> Self {
        Self { provider, interval }
    }

    /// Spawns the sweep loop. The first tick fires immediately.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) {
        let mut conn = match self.provider.get_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Badge sweep could not get a connection");
                return;
            }
        };

        match badge::sweep(&mut conn, Utc::now()).await {
            Ok(report) if report.badges_granted > 0 || report.failures > 0 => {
                tracing::info!(
                    users_checked = report.users_checked,
                    badges_granted = report.badges_granted,
                    failures = report.failures,
                    "Badge sweep finished"
                );
            }
            Ok(report) => {
                tracing::debug!(users_checked = report.users_checked, "Badge sweep found nothing due");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Badge sweep failed");
            }
        }
    }
}
