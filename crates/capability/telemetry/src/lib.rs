//! 日志初始化与进程内计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 同步链路指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub decode_failures: u64,
    pub handler_failures: u64,
    pub unhandled_events: u64,
    pub sensor_updates: u64,
    pub controller_updates: u64,
    pub status_updates: u64,
    pub acks_received: u64,
    pub unknown_gateway_drops: u64,
    pub connects: u64,
    pub reconnect_attempts: u64,
    pub subscribe_failures: u64,
}

/// 同步链路指标。
pub struct SyncMetrics {
    messages_received: AtomicU64,
    decode_failures: AtomicU64,
    handler_failures: AtomicU64,
    unhandled_events: AtomicU64,
    sensor_updates: AtomicU64,
    controller_updates: AtomicU64,
    status_updates: AtomicU64,
    acks_received: AtomicU64,
    unknown_gateway_drops: AtomicU64,
    connects: AtomicU64,
    reconnect_attempts: AtomicU64,
    subscribe_failures: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            unhandled_events: AtomicU64::new(0),
            sensor_updates: AtomicU64::new(0),
            controller_updates: AtomicU64::new(0),
            status_updates: AtomicU64::new(0),
            acks_received: AtomicU64::new(0),
            unknown_gateway_drops: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            subscribe_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            unhandled_events: self.unhandled_events.load(Ordering::Relaxed),
            sensor_updates: self.sensor_updates.load(Ordering::Relaxed),
            controller_updates: self.controller_updates.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            unknown_gateway_drops: self.unknown_gateway_drops.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            subscribe_failures: self.subscribe_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<SyncMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static SyncMetrics {
    METRICS.get_or_init(SyncMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录收到一条入站报文。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录一条报文解码失败（坏主题或坏负载）。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次处理器执行失败。
pub fn record_handler_failure() {
    metrics().handler_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录一条无人订阅的事件。
pub fn record_unhandled_event() {
    metrics().unhandled_events.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次传感器读数合并。
pub fn record_sensor_update() {
    metrics().sensor_updates.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次控制器开关合并。
pub fn record_controller_update() {
    metrics().controller_updates.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次控制器状态信息合并。
pub fn record_status_update() {
    metrics().status_updates.fetch_add(1, Ordering::Relaxed);
}

/// 记录一条应答。
pub fn record_ack_received() {
    metrics().acks_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录一条指向清单外网关的更新。
pub fn record_unknown_gateway_drop() {
    metrics().unknown_gateway_drops.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次连接建立。
pub fn record_connect() {
    metrics().connects.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次重连尝试。
pub fn record_reconnect_attempt() {
    metrics().reconnect_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次订阅失败。
pub fn record_subscribe_failure() {
    metrics().subscribe_failures.fetch_add(1, Ordering::Relaxed);
}
