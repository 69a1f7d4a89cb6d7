use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::SessionRegistry;

/// Periodically evict calls that never reached a terminal event.
///
/// The task runs until aborted through the returned handle.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    info!(
        interval_secs = interval.as_secs(),
        max_age_secs = max_age.as_secs(),
        "Starting session sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = registry.sweep_expired(max_age);
            debug!(evicted, remaining = registry.len(), "Session sweep complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::CallContext;

    #[tokio::test]
    async fn test_sweeper_evicts_old_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        let context = CallContext {
            business_name: "Acme".to_string(),
            product_category: "Widgets".to_string(),
            brand_name: "Acme Co".to_string(),
        };
        registry.get_or_create("CA1", context);

        let handle = spawn_sweeper(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(5),
        );

        let mut cleared = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if registry.is_empty() {
                cleared = true;
                break;
            }
        }
        handle.abort();
        assert!(cleared, "sweeper never evicted the stale session");
    }
}
