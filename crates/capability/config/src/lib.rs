//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 会话作用域：农场 ID，会话期内不变。
    pub farm_id: String,
    pub mqtt_url: String,
    pub mqtt_enabled: bool,
    pub mqtt_retry_seconds: u64,
    pub mqtt_connect_timeout_seconds: u64,
    pub mqtt_keep_alive_seconds: u64,
    /// 基线清单 JSON 文件路径；缺省时以空清单启动。
    pub inventory_path: Option<String>,
    pub summary_interval_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let farm_id = env::var("FARMSYNC_FARM_ID")
            .map_err(|_| ConfigError::Missing("FARMSYNC_FARM_ID".to_string()))?;
        let mqtt_url = env::var("FARMSYNC_MQTT_URL")
            .unwrap_or_else(|_| "wss://127.0.0.1:8084/mqtt".to_string());
        let mqtt_enabled = read_bool_with_default("FARMSYNC_MQTT_ENABLED", true);
        let mqtt_retry_seconds = read_u64_with_default("FARMSYNC_MQTT_RETRY_SECONDS", 5)?;
        let mqtt_connect_timeout_seconds =
            read_u64_with_default("FARMSYNC_MQTT_CONNECT_TIMEOUT_SECONDS", 30)?;
        let mqtt_keep_alive_seconds =
            read_u64_with_default("FARMSYNC_MQTT_KEEP_ALIVE_SECONDS", 30)?;
        let inventory_path = read_optional("FARMSYNC_INVENTORY_PATH");
        let summary_interval_seconds =
            read_u64_with_default("FARMSYNC_SUMMARY_INTERVAL_SECONDS", 60)?;

        Ok(Self {
            farm_id,
            mqtt_url,
            mqtt_enabled,
            mqtt_retry_seconds,
            mqtt_connect_timeout_seconds,
            mqtt_keep_alive_seconds,
            inventory_path,
            summary_interval_seconds,
        })
    }
}

/// 读取可选环境变量（空串视为缺省）。
fn read_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// 读取 u64 类型环境变量，缺省时取默认值。
fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(default),
    }
}

/// 读取 bool 类型环境变量，缺省时取默认值。
///
/// 与面板端约定一致：只有显式的 "false"/"0" 视为关闭。
fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => !matches!(value.to_lowercase().as_str(), "false" | "0"),
        Err(_) => default,
    }
}
