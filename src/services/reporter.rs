//! 聚合计数上报
//!
//! 计数变化时把 `{blinks, mouthOpens, browRaises, recordedAt}` POST 到
//! 外部接口。有界队列加固定最小发送间隔，避免高帧率下打爆对端；
//! 队列满了直接丢弃并告警，绝不反压到帧处理路径。
//! 检测核心对上报通道一无所知。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::config::ReportConfig;

/// One outbound aggregate-count payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureReport {
    pub blinks: u64,
    pub mouth_opens: u64,
    pub brow_raises: u64,
    pub recorded_at: DateTime<Utc>,
}

impl GestureReport {
    pub fn new(blinks: u64, mouth_opens: u64, brow_raises: u64) -> Self {
        Self {
            blinks,
            mouth_opens,
            brow_raises,
            recorded_at: Utc::now(),
        }
    }

    /// The zeroed payload recorded when the counters are reset.
    pub fn zeroed() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Handle for enqueueing reports. Cheap to clone; the drain task lives for
/// the duration of the service.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: Option<mpsc::Sender<GestureReport>>,
}

impl Reporter {
    /// Spawn the drain task. An empty endpoint disables reporting entirely;
    /// `enqueue` then becomes a silent no-op.
    pub fn spawn(config: &ReportConfig, shutdown_rx: broadcast::Receiver<()>) -> Self {
        if config.endpoint_url.trim().is_empty() {
            tracing::info!("Report endpoint not configured; outbound reporting disabled");
            return Self { tx: None };
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let endpoint = config.endpoint_url.clone();
        let min_interval = Duration::from_millis(config.min_interval_ms);

        tokio::spawn(drain_queue(client, endpoint, min_interval, rx, shutdown_rx));

        Self { tx: Some(tx) }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn enqueue(&self, report: GestureReport) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(report) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Report queue full, dropping payload");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Report queue closed, dropping payload");
            }
        }
    }
}

async fn drain_queue(
    client: reqwest::Client,
    endpoint: String,
    min_interval: Duration,
    mut rx: mpsc::Receiver<GestureReport>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(report) => {
                    post_report(&client, &endpoint, &report).await;
                    // 连发之间保持最小间隔
                    tokio::time::sleep(min_interval).await;
                }
                None => break,
            },
            _ = shutdown_rx.recv() => {
                tracing::info!("Reporter shutting down");
                break;
            }
        }
    }
}

async fn post_report(client: &reqwest::Client, endpoint: &str, report: &GestureReport) {
    match client.post(endpoint).json(report).send().await {
        Ok(resp) if !resp.status().is_success() => {
            tracing::warn!(status = %resp.status(), "Report POST rejected");
        }
        Ok(_) => {
            tracing::debug!(
                blinks = report.blinks,
                mouth_opens = report.mouth_opens,
                brow_raises = report.brow_raises,
                "Report delivered"
            );
        }
        Err(error) => {
            tracing::error!(error = %error, "Report POST failed");
        }
    }
}
