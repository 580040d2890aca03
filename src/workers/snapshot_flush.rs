use tokio::sync::Mutex;

use crate::state::TrackerCell;
use crate::store::operations::snapshots::CounterSnapshot;
use crate::store::Store;

/// Persist the current aggregate counters. Unchanged totals are skipped so
/// an idle tracker does not grow the snapshot tree.
pub async fn run(tracker: &Mutex<TrackerCell>, store: &Store) {
    tracing::debug!("snapshot_flush: start");

    let snapshot = tracker.lock().await.tracker.snapshot();

    let unchanged = match store.latest_counter_snapshot() {
        Ok(Some(latest)) => latest.totals() == snapshot.totals(),
        Ok(None) => snapshot.totals() == (0, 0, 0),
        Err(e) => {
            tracing::error!(error=%e, "snapshot_flush: failed to read latest snapshot");
            return;
        }
    };
    if unchanged {
        tracing::debug!("snapshot_flush: totals unchanged, skipping");
        return;
    }

    let record = CounterSnapshot {
        id: uuid::Uuid::new_v4().to_string(),
        blinks: snapshot.blinks,
        mouth_opens: snapshot.mouth_opens,
        brow_raises: snapshot.brow_raises,
        recorded_at: chrono::Utc::now(),
    };

    match store.save_counter_snapshot(&record) {
        Ok(()) => tracing::debug!("snapshot_flush: done"),
        Err(e) => tracing::error!(error=%e, "snapshot_flush failed"),
    }
}
