//! 表情阈值配置
//!
//! 每个表情一对迟滞阈值加一个去抖帧数。基础配置来自 JSON 文件，
//! 可被存储中的持久化覆盖段落级合并；合并结果在构造检测器之前
//! 必须通过校验，非法配置立即失败而不是运行时容忍。

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Eye closure: EAR at or below `close_threshold` supports "closed", at or
/// above `open_threshold` supports "open"; between the two is the
/// hysteresis band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeThresholds {
    pub close_threshold: f64,
    pub open_threshold: f64,
    pub min_frames: u32,
}

impl Default for EyeThresholds {
    fn default() -> Self {
        Self {
            close_threshold: 0.20,
            open_threshold: 0.25,
            min_frames: 2,
        }
    }
}

/// Mouth opening: MAR at or above `open_threshold` supports "open", at or
/// below `close_threshold` supports "closed".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouthThresholds {
    pub open_threshold: f64,
    pub close_threshold: f64,
    pub min_frames: u32,
}

impl Default for MouthThresholds {
    fn default() -> Self {
        Self {
            open_threshold: 0.60,
            close_threshold: 0.50,
            min_frames: 2,
        }
    }
}

/// Brow raise: the brow fraction at or above `raise_threshold_pct` supports
/// "raised", at or below `relax_threshold_pct` supports "relaxed".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowThresholds {
    pub raise_threshold_pct: f64,
    pub relax_threshold_pct: f64,
    pub min_frames: u32,
}

impl Default for BrowThresholds {
    fn default() -> Self {
        Self {
            raise_threshold_pct: 0.08,
            relax_threshold_pct: 0.04,
            min_frames: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    #[serde(default)]
    pub eye: EyeThresholds,
    #[serde(default)]
    pub mouth: MouthThresholds,
    #[serde(default)]
    pub brow: BrowThresholds,
}

/// Partial override, one whole section per expression. Mirrors the shallow
/// merge the capture page historically applied to its stored overrides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye: Option<EyeThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouth: Option<MouthThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brow: Option<BrowThresholds>,
}

impl ThresholdOverrides {
    pub fn is_empty(&self) -> bool {
        self.eye.is_none() && self.mouth.is_none() && self.brow.is_none()
    }
}

impl ThresholdConfig {
    /// Load the base config from a JSON file. A missing or unparseable file
    /// falls back to the built-in defaults with a warning; the service must
    /// come up even on a fresh deployment.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(raw) => match serde_json::from_slice::<ThresholdConfig>(&raw) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse thresholds file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "Thresholds file not readable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Section-wise merge: an override section replaces that expression's
    /// thresholds entirely.
    pub fn merged(&self, overrides: &ThresholdOverrides) -> Self {
        Self {
            eye: overrides.eye.unwrap_or(self.eye),
            mouth: overrides.mouth.unwrap_or(self.mouth),
            brow: overrides.brow.unwrap_or(self.brow),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, low, high, min_frames) in [
            (
                "eye",
                self.eye.close_threshold,
                self.eye.open_threshold,
                self.eye.min_frames,
            ),
            (
                "mouth",
                self.mouth.close_threshold,
                self.mouth.open_threshold,
                self.mouth.min_frames,
            ),
            (
                "brow",
                self.brow.relax_threshold_pct,
                self.brow.raise_threshold_pct,
                self.brow.min_frames,
            ),
        ] {
            if !low.is_finite() || !high.is_finite() {
                return Err(format!("{name}: thresholds must be finite"));
            }
            if low < 0.0 || high < 0.0 {
                return Err(format!("{name}: thresholds must be >= 0"));
            }
            // 两个阈值之间必须留出迟滞带，相等也不允许
            if low >= high {
                return Err(format!(
                    "{name}: thresholds must leave a hysteresis band (got {low} >= {high})"
                ));
            }
            if min_frames < 1 {
                return Err(format!("{name}: minFrames must be >= 1"));
            }
        }
        Ok(())
    }
}
