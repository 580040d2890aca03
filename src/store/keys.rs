pub fn threshold_overrides_key() -> String {
    "overrides:latest".to_string()
}

/// Reverse-timestamp key so a forward scan yields newest snapshots first.
pub fn counter_snapshot_key(timestamp_ms: i64, snapshot_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{:020}:{}", reverse_ts, snapshot_id)
}
