use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Mutex};

use crate::config::Config;
use crate::detector::{ExpressionTracker, TrackerSnapshot};
use crate::services::reporter::Reporter;
use crate::store::Store;

/// The tracker plus the last counter totals handed to the reporter.
/// 同一把锁保护两者：update 与变化检测必须原子，帧处理才是严格串行的。
#[derive(Debug)]
pub struct TrackerCell {
    pub tracker: ExpressionTracker,
    pub last_reported: (u64, u64, u64),
}

impl TrackerCell {
    pub fn new(tracker: ExpressionTracker) -> Self {
        Self {
            tracker,
            last_reported: (0, 0, 0),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    tracker: Arc<Mutex<TrackerCell>>,
    reporter: Reporter,
    events_tx: broadcast::Sender<TrackerSnapshot>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        tracker: Arc<Mutex<TrackerCell>>,
        reporter: Reporter,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            store,
            tracker,
            reporter,
            events_tx,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tracker(&self) -> &Mutex<TrackerCell> {
        &self.tracker
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn events_tx(&self) -> &broadcast::Sender<TrackerSnapshot> {
        &self.events_tx
    }

    pub fn events_rx(&self) -> broadcast::Receiver<TrackerSnapshot> {
        self.events_tx.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::config::Config;
    use crate::detector::{ExpressionTracker, ThresholdConfig};
    use crate::services::reporter::Reporter;
    use crate::store::Store;

    use super::*;

    fn test_state(tmp: &tempfile::TempDir) -> AppState {
        let cfg = Config::from_env();
        let store =
            Arc::new(Store::open(tmp.path().join("state.sled").to_str().unwrap()).unwrap());
        let tracker = ExpressionTracker::new(ThresholdConfig::default()).unwrap();
        let cell = Arc::new(Mutex::new(TrackerCell::new(tracker)));
        let (tx, _) = broadcast::channel(4);
        AppState::new(store, cell, Reporter::disabled(), &cfg, tx)
    }

    #[tokio::test]
    async fn tracker_cell_starts_with_zero_last_reported() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(&tmp);
        let cell = state.tracker().lock().await;
        assert_eq!(cell.last_reported, (0, 0, 0));
        assert_eq!(cell.tracker.snapshot().totals(), (0, 0, 0));
    }

    #[tokio::test]
    async fn event_receivers_see_broadcasts() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(&tmp);

        let mut rx = state.events_rx();
        let snapshot = {
            let cell = state.tracker().lock().await;
            cell.tracker.snapshot()
        };
        state.events_tx().send(snapshot).unwrap();
        assert_eq!(rx.recv().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(&tmp);

        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        state.shutdown_tx().send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
