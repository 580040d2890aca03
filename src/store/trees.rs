pub const THRESHOLD_OVERRIDES: &str = "threshold_overrides";
pub const COUNTER_SNAPSHOTS: &str = "counter_snapshots";
