use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::{broadcast, Mutex};

use gesture_backend::config::{Config, LimitsConfig, ReportConfig, WorkerConfig};
use gesture_backend::detector::{ExpressionTracker, ThresholdConfig};
use gesture_backend::routes::build_router;
use gesture_backend::services::reporter::Reporter;
use gesture_backend::state::{AppState, TrackerCell};
use gesture_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with_thresholds(ThresholdConfig::default()).await
}

pub async fn spawn_with_thresholds(thresholds: ThresholdConfig) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("gesture-test.sled");

    // 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        // 不存在的文件：基础配置回落到内置默认值
        thresholds_path: temp_dir
            .path()
            .join("thresholds.json")
            .to_string_lossy()
            .to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        // Empty endpoint keeps the reporter disabled under test.
        report: ReportConfig::default(),
        worker: WorkerConfig {
            is_leader: false,
            enable_snapshot_flush: false,
        },
        limits: LimitsConfig::default(),
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    let tracker = ExpressionTracker::new(thresholds).expect("valid thresholds");
    let cell = Arc::new(Mutex::new(TrackerCell::new(tracker)));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let reporter = Reporter::spawn(&config.report, shutdown_tx.subscribe());

    let state = AppState::new(store, cell, reporter, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}
