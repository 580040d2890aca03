//! 表情事件跟踪器
//!
//! 三条互相独立的迟滞/去抖状态机（闭眼、张嘴、挑眉）。迟滞带吸收
//! 单阈值附近的抖动，连续帧去抖吸收单帧关键点毛刺：真实的一次眨眼
//! 只计一次，单帧 EAR 凹陷不计。
//!
//! 跟踪器独占全部通道状态；调用方通过 `update` 推进、通过
//! `snapshot` 获得只读视图、通过 `reset_counters` 清零计数。

use serde::Serialize;

use super::metrics::Metrics;
use super::thresholds::ThresholdConfig;

/// Directional evidence a single frame provides for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    /// Scalar crossed the enter-active threshold.
    TowardActive,
    /// Scalar crossed the exit-active threshold.
    TowardInactive,
    /// Inside the hysteresis band: no directional evidence.
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    TowardActive,
    TowardInactive,
}

/// One hysteresis/debounce state machine over a scalar stream.
#[derive(Debug, Clone)]
struct ExpressionChannel {
    active: bool,
    pending: Pending,
    pending_frames: u32,
    counter: u64,
    min_frames: u32,
}

impl ExpressionChannel {
    fn new(min_frames: u32) -> Self {
        Self {
            active: false,
            pending: Pending::None,
            pending_frames: 0,
            counter: 0,
            min_frames,
        }
    }

    /// Feed one frame of directional evidence and commit a transition once
    /// `min_frames` consecutive supporting frames have accumulated.
    fn observe(&mut self, observation: Observation) {
        match observation {
            // 迟滞带内不做任何决定，也不清空已有的待定计数
            Observation::Neutral => {}
            Observation::TowardActive if self.pending == Pending::TowardActive => {
                self.pending_frames += 1;
            }
            Observation::TowardInactive if self.pending == Pending::TowardInactive => {
                self.pending_frames += 1;
            }
            Observation::TowardActive if !self.active => {
                self.pending = Pending::TowardActive;
                self.pending_frames = 1;
            }
            Observation::TowardInactive if self.active => {
                self.pending = Pending::TowardInactive;
                self.pending_frames = 1;
            }
            // 证据支持当前已确认的状态：撤销相反方向的待定计数，
            // 保证 min_frames 表示的是连续支持帧
            _ => {
                self.pending = Pending::None;
                self.pending_frames = 0;
            }
        }

        let departing = match self.pending {
            Pending::TowardActive => !self.active,
            Pending::TowardInactive => self.active,
            Pending::None => false,
        };

        if departing && self.pending_frames >= self.min_frames {
            self.active = !self.active;
            self.pending = Pending::None;
            self.pending_frames = 0;
            // 只有进入激活态的边沿计数，退出不计
            if self.active {
                self.counter += 1;
            }
        }
    }
}

/// Read-only view of the tracker after a tick: current confirmed states and
/// monotone event counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub eye_is_closed: bool,
    pub mouth_is_open: bool,
    pub brow_is_raised: bool,
    pub blinks: u64,
    pub mouth_opens: u64,
    pub brow_raises: u64,
}

impl TrackerSnapshot {
    /// The three counters alone, for change detection in the glue layers.
    pub fn totals(&self) -> (u64, u64, u64) {
        (self.blinks, self.mouth_opens, self.brow_raises)
    }
}

/// The expression event tracker: three independent channels driven once per
/// captured frame.
#[derive(Debug, Clone)]
pub struct ExpressionTracker {
    config: ThresholdConfig,
    eye: ExpressionChannel,
    mouth: ExpressionChannel,
    brow: ExpressionChannel,
}

impl ExpressionTracker {
    /// Build a tracker from a validated configuration. Invalid thresholds
    /// are a construction-time error, never tolerated at runtime.
    pub fn new(config: ThresholdConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            eye: ExpressionChannel::new(config.eye.min_frames),
            mouth: ExpressionChannel::new(config.mouth.min_frames),
            brow: ExpressionChannel::new(config.brow.min_frames),
            config,
        })
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Advance all three channels by one tick.
    ///
    /// `None`（本帧没有检测到人脸）是空操作：待定计数被冻结而不是
    /// 清零，短暂的检测空洞按噪声处理。
    pub fn update(&mut self, metrics: Option<&Metrics>) -> TrackerSnapshot {
        if let Some(m) = metrics {
            self.eye.observe(classify_low_enters(
                m.ear,
                self.config.eye.close_threshold,
                self.config.eye.open_threshold,
            ));
            self.mouth.observe(classify_high_enters(
                m.mar,
                self.config.mouth.open_threshold,
                self.config.mouth.close_threshold,
            ));
            self.brow.observe(classify_high_enters(
                m.brow,
                self.config.brow.raise_threshold_pct,
                self.config.brow.relax_threshold_pct,
            ));
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            eye_is_closed: self.eye.active,
            mouth_is_open: self.mouth.active,
            brow_is_raised: self.brow.active,
            blinks: self.eye.counter,
            mouth_opens: self.mouth.counter,
            brow_raises: self.brow.counter,
        }
    }

    /// Zero the three counters. Confirmed states and in-progress pending
    /// runs are preserved so a gesture spanning the reset is not lost.
    pub fn reset_counters(&mut self) {
        self.eye.counter = 0;
        self.mouth.counter = 0;
        self.brow.counter = 0;
    }
}

/// Channels where a *low* scalar means active (eye closure: EAR drops).
fn classify_low_enters(value: f64, enter: f64, exit: f64) -> Observation {
    if value <= enter {
        Observation::TowardActive
    } else if value >= exit {
        Observation::TowardInactive
    } else {
        Observation::Neutral
    }
}

/// Channels where a *high* scalar means active (mouth opening, brow raise).
fn classify_high_enters(value: f64, enter: f64, exit: f64) -> Observation {
    if value >= enter {
        Observation::TowardActive
    } else if value <= exit {
        Observation::TowardInactive
    } else {
        Observation::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::super::thresholds::{BrowThresholds, EyeThresholds, MouthThresholds};
    use super::*;

    fn tracker() -> ExpressionTracker {
        ExpressionTracker::new(ThresholdConfig::default()).expect("valid default config")
    }

    fn metrics(ear: f64, mar: f64, brow: f64) -> Metrics {
        Metrics { ear, mar, brow }
    }

    /// Neutral values sit inside every default hysteresis band... no wait,
    /// neutral means "clearly inactive" here: eyes open, mouth shut, brows
    /// relaxed.
    fn neutral() -> Metrics {
        metrics(0.30, 0.40, 0.02)
    }

    fn feed_ear(t: &mut ExpressionTracker, sequence: &[f64]) -> TrackerSnapshot {
        let mut last = t.snapshot();
        for &ear in sequence {
            last = t.update(Some(&metrics(ear, 0.40, 0.02)));
        }
        last
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let mut cfg = ThresholdConfig::default();
        cfg.eye.min_frames = 0;
        assert!(ExpressionTracker::new(cfg).is_err());
    }

    #[test]
    fn starts_inactive_with_zero_counters() {
        let t = tracker();
        let s = t.snapshot();
        assert!(!s.eye_is_closed && !s.mouth_is_open && !s.brow_is_raised);
        assert_eq!(s.totals(), (0, 0, 0));
    }

    #[test]
    fn sustained_closure_counts_one_blink_on_the_min_frames_th_frame() {
        let mut t = tracker();
        t.update(Some(&neutral()));

        let s = t.update(Some(&metrics(0.18, 0.40, 0.02)));
        assert!(!s.eye_is_closed, "one supporting frame must not commit");
        assert_eq!(s.blinks, 0);

        let s = t.update(Some(&metrics(0.17, 0.40, 0.02)));
        assert!(s.eye_is_closed, "second consecutive frame commits");
        assert_eq!(s.blinks, 1);
    }

    #[test]
    fn reopening_needs_the_same_debounce_and_does_not_count() {
        let mut t = tracker();
        feed_ear(&mut t, &[0.30, 0.18, 0.17]);
        assert!(t.snapshot().eye_is_closed);

        let s = feed_ear(&mut t, &[0.30]);
        assert!(s.eye_is_closed, "one frame above the band must not reopen");

        let s = feed_ear(&mut t, &[0.30]);
        assert!(!s.eye_is_closed);
        assert_eq!(s.blinks, 1, "deactivation never increments");
    }

    #[test]
    fn alternating_noise_never_counts() {
        let mut t = tracker();
        let s = feed_ear(&mut t, &[0.30, 0.18, 0.30, 0.18, 0.30]);
        assert_eq!(s.blinks, 0);
        assert!(!s.eye_is_closed);
    }

    #[test]
    fn band_frames_freeze_the_pending_run() {
        // close=0.20 / open=0.25: 0.22 sits inside the band. A band frame
        // between two supporting frames must neither cancel nor extend the
        // run, so the second low frame still completes it.
        let mut t = tracker();
        let s = feed_ear(&mut t, &[0.30, 0.18, 0.22, 0.18]);
        assert!(s.eye_is_closed);
        assert_eq!(s.blinks, 1);
    }

    #[test]
    fn band_only_sequences_change_nothing() {
        let mut t = tracker();
        let before = t.snapshot();
        let after = feed_ear(&mut t, &[0.22; 50]);
        assert_eq!(before, after);
    }

    #[test]
    fn below_debounce_support_then_neutral_does_not_commit() {
        let mut cfg = ThresholdConfig::default();
        cfg.eye.min_frames = 3;
        let mut t = ExpressionTracker::new(cfg).unwrap();

        // Exactly min_frames - 1 supporting frames, then clearly open.
        let s = feed_ear(&mut t, &[0.18, 0.18, 0.30, 0.30, 0.30]);
        assert_eq!(s.blinks, 0);
        assert!(!s.eye_is_closed);
    }

    #[test]
    fn missing_face_frames_are_a_no_op() {
        let mut t = tracker();
        feed_ear(&mut t, &[0.30, 0.18]);

        // Detection gap mid-blink: pending run is frozen, not reset.
        let before = t.snapshot();
        let s = t.update(None);
        assert_eq!(s, before);

        let s = t.update(Some(&metrics(0.17, 0.40, 0.02)));
        assert!(s.eye_is_closed, "gap must not break the consecutive run");
        assert_eq!(s.blinks, 1);
    }

    #[test]
    fn channels_are_independent() {
        let mut t = tracker();
        t.update(Some(&neutral()));

        // Mouth opens while the eyes stay open and brows stay down.
        let mut s = t.snapshot();
        for _ in 0..2 {
            s = t.update(Some(&metrics(0.30, 0.70, 0.02)));
        }
        assert!(s.mouth_is_open);
        assert!(!s.eye_is_closed && !s.brow_is_raised);
        assert_eq!(s.totals(), (0, 1, 0));

        // Brow raise joins in; the mouth stays open.
        for _ in 0..2 {
            s = t.update(Some(&metrics(0.30, 0.70, 0.10)));
        }
        assert!(s.mouth_is_open && s.brow_is_raised);
        assert_eq!(s.totals(), (0, 1, 1));
    }

    #[test]
    fn counters_survive_many_cycles() {
        let mut t = tracker();
        for _ in 0..5 {
            feed_ear(&mut t, &[0.30, 0.30, 0.18, 0.17, 0.30, 0.30]);
        }
        assert_eq!(t.snapshot().blinks, 5);
    }

    #[test]
    fn reset_zeroes_counters_only_and_is_idempotent() {
        let mut t = tracker();
        feed_ear(&mut t, &[0.18, 0.17]);
        assert_eq!(t.snapshot().blinks, 1);
        assert!(t.snapshot().eye_is_closed);

        // Start a reopening run, then reset in the middle of it.
        feed_ear(&mut t, &[0.30]);
        t.reset_counters();
        t.reset_counters();

        let s = t.snapshot();
        assert_eq!(s.totals(), (0, 0, 0));
        assert!(s.eye_is_closed, "reset must not touch the confirmed state");

        // The pending reopening run was preserved: one more frame commits.
        let s = feed_ear(&mut t, &[0.30]);
        assert!(!s.eye_is_closed);
        assert_eq!(s.blinks, 0);
    }

    #[test]
    fn threshold_equality_counts_as_crossing() {
        let mut cfg = ThresholdConfig::default();
        cfg.eye = EyeThresholds {
            close_threshold: 0.20,
            open_threshold: 0.25,
            min_frames: 1,
        };
        let mut t = ExpressionTracker::new(cfg).unwrap();

        let s = feed_ear(&mut t, &[0.20]);
        assert!(s.eye_is_closed, "v == closeThreshold supports closing");
        let s = feed_ear(&mut t, &[0.25]);
        assert!(!s.eye_is_closed, "v == openThreshold supports opening");
    }

    #[test]
    fn min_frames_one_commits_immediately() {
        let mut cfg = ThresholdConfig::default();
        cfg.mouth = MouthThresholds {
            open_threshold: 0.60,
            close_threshold: 0.50,
            min_frames: 1,
        };
        cfg.brow = BrowThresholds {
            raise_threshold_pct: 0.08,
            relax_threshold_pct: 0.04,
            min_frames: 1,
        };
        let mut t = ExpressionTracker::new(cfg).unwrap();

        let s = t.update(Some(&metrics(0.30, 0.65, 0.09)));
        assert!(s.mouth_is_open && s.brow_is_raised);
        assert_eq!(s.totals(), (0, 1, 1));
    }
}
