use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub thresholds_path: String,
    pub cors_origin: String,
    pub report: ReportConfig,
    pub worker: WorkerConfig,
    pub limits: LimitsConfig,
}

/// Outbound aggregate-count reporting. An empty endpoint disables it.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub endpoint_url: String,
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
    pub queue_capacity: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            min_interval_ms: 800,
            timeout_secs: 10,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_snapshot_flush: bool,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_sse_connections: usize,
    pub max_snapshot_page: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sse_connections: 64,
            max_snapshot_page: 200,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/gesture.sled"),
            thresholds_path: env_or("THRESHOLDS_PATH", "./config/thresholds.json"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            report: ReportConfig {
                endpoint_url: env_or("REPORT_URL", ""),
                min_interval_ms: env_or_parse("REPORT_MIN_INTERVAL_MS", 800_u64),
                timeout_secs: env_or_parse("REPORT_TIMEOUT_SECS", 10_u64),
                queue_capacity: env_or_parse("REPORT_QUEUE_CAPACITY", 64_usize),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                enable_snapshot_flush: env_or_bool("ENABLE_SNAPSHOT_FLUSH_WORKER", true),
            },
            limits: LimitsConfig {
                max_sse_connections: env_or_parse("MAX_SSE_CONNECTIONS", 64_usize),
                max_snapshot_page: env_or_parse("MAX_SNAPSHOT_PAGE", 200_usize),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
