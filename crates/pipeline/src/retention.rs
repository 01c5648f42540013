//! Periodic cleanup of terminal jobs.
//!
//! Completed and failed jobs stay readable through `get` and `list` for
//! the retention window, then this loop drops them from memory. Durable
//! projections are never touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use superres_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::manager::JobManager;

/// Run the retention sweep every `every` until `cancel` is triggered.
pub async fn run(
    manager: Arc<JobManager>,
    retention: Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = every.as_secs(),
        "Job retention sweep started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let Some(cutoff) = cutoff(retention) else {
                    tracing::debug!("Job retention: window exceeds clock range");
                    continue;
                };
                let purged = manager.purge_terminal(cutoff);
                if purged > 0 {
                    tracing::info!(purged, "Job retention: dropped terminal jobs");
                } else {
                    tracing::debug!("Job retention: nothing to drop");
                }
            }
        }
    }
}

/// Terminal jobs finished at or before this instant are expired.
fn cutoff(retention: Duration) -> Option<Timestamp> {
    let window = chrono::Duration::from_std(retention).ok()?;
    Utc::now().checked_sub_signed(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_in_the_past() {
        let minute = chrono::Duration::seconds(60);
        let before = Utc::now();
        let cutoff = cutoff(Duration::from_secs(60)).unwrap();
        let after = Utc::now();
        assert!(cutoff >= before - minute && cutoff <= after - minute);
    }

    #[test]
    fn unbounded_window_has_no_cutoff() {
        assert_eq!(cutoff(Duration::MAX), None);
    }
}
