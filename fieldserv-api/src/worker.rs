use chrono::Utc;
use fieldserv_order::SchedulingCoordinator;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::info;

/// Periodically purges pending orders that stayed unpaid past the TTL and
/// frees their held worker-hours.
pub async fn start_expiry_worker(coordinator: Arc<SchedulingCoordinator>, every_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(every_seconds));
    info!(every_seconds, "Expiry worker started");

    loop {
        ticker.tick().await;
        let purged = coordinator.sweep_expired(Utc::now()).await;
        if !purged.is_empty() {
            info!(count = purged.len(), "Purged expired unpaid orders");
        }
    }
}
