//! 表情事件检测核心
//!
//! 两层结构：`metrics` 把一帧关键点映射为三个标量指标（纯函数），
//! `tracker` 对指标流运行迟滞/去抖状态机并维护事件计数。
//! 服务层（路由、上报、持久化）只通过这两个入口接触检测逻辑。

pub mod mesh;
pub mod metrics;
pub mod thresholds;
pub mod tracker;

pub use mesh::{Landmark, LandmarkFrame};
pub use metrics::{extract, Metrics};
pub use thresholds::{ThresholdConfig, ThresholdOverrides};
pub use tracker::{ExpressionTracker, TrackerSnapshot};
