use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionStore;

/// Spawn the periodic eviction task. It ends when `shutdown` flips to true
/// or its sender is dropped.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let evicted = store.sweep();
                    tracing::debug!(evicted, live = store.len(), "session sweep");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("session sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn sweeper_evicts_and_stops_on_shutdown() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let stale = store.create_at(chrono::Utc::now() - chrono::Duration::hours(1));
        let live = store.create();

        let (tx, rx) = watch::channel(false);
        let handle = spawn_sweeper(Arc::clone(&store), Duration::from_millis(20), rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.get(stale.token()).is_none());
        assert!(store.get(live.token()).is_some());
        assert_eq!(store.len(), 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
