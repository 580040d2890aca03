use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// One persisted reading of the aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub id: String,
    pub blinks: u64,
    pub mouth_opens: u64,
    pub brow_raises: u64,
    pub recorded_at: DateTime<Utc>,
}

impl CounterSnapshot {
    pub fn totals(&self) -> (u64, u64, u64) {
        (self.blinks, self.mouth_opens, self.brow_raises)
    }
}

impl Store {
    pub fn save_counter_snapshot(&self, snapshot: &CounterSnapshot) -> Result<(), StoreError> {
        let key = keys::counter_snapshot_key(snapshot.recorded_at.timestamp_millis(), &snapshot.id);
        self.counter_snapshots
            .insert(key.as_bytes(), Self::serialize(snapshot)?)?;
        Ok(())
    }

    /// Newest first, thanks to the reverse-timestamp key layout.
    pub fn list_counter_snapshots(&self, limit: usize) -> Result<Vec<CounterSnapshot>, StoreError> {
        let mut out = Vec::with_capacity(limit.min(64));
        for entry in self.counter_snapshots.iter().take(limit) {
            let (_, raw) = entry?;
            out.push(Self::deserialize(&raw)?);
        }
        Ok(out)
    }

    /// The most recently persisted snapshot, if any.
    pub fn latest_counter_snapshot(&self) -> Result<Option<CounterSnapshot>, StoreError> {
        match self.counter_snapshots.first()? {
            Some((_, raw)) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
