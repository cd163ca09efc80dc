//! 日志初始化与链路计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 链路指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub bus_messages: u64,
    pub envelopes: u64,
    pub dropped_unknown_channel: u64,
    pub dropped_decode: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
    pub dropped_deliveries: u64,
    pub viewers_connected: u64,
    pub viewers_disconnected: u64,
    pub client_messages: u64,
    pub client_decode_drops: u64,
    pub reconnect_attempts: u64,
    pub alerts_fired: u64,
    pub alerts_suppressed: u64,
}

/// 链路指标。
pub struct TelemetryMetrics {
    bus_messages: AtomicU64,
    envelopes: AtomicU64,
    dropped_unknown_channel: AtomicU64,
    dropped_decode: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    dropped_deliveries: AtomicU64,
    viewers_connected: AtomicU64,
    viewers_disconnected: AtomicU64,
    client_messages: AtomicU64,
    client_decode_drops: AtomicU64,
    reconnect_attempts: AtomicU64,
    alerts_fired: AtomicU64,
    alerts_suppressed: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            bus_messages: AtomicU64::new(0),
            envelopes: AtomicU64::new(0),
            dropped_unknown_channel: AtomicU64::new(0),
            dropped_decode: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            dropped_deliveries: AtomicU64::new(0),
            viewers_connected: AtomicU64::new(0),
            viewers_disconnected: AtomicU64::new(0),
            client_messages: AtomicU64::new(0),
            client_decode_drops: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            alerts_suppressed: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bus_messages: self.bus_messages.load(Ordering::Relaxed),
            envelopes: self.envelopes.load(Ordering::Relaxed),
            dropped_unknown_channel: self.dropped_unknown_channel.load(Ordering::Relaxed),
            dropped_decode: self.dropped_decode.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
            viewers_connected: self.viewers_connected.load(Ordering::Relaxed),
            viewers_disconnected: self.viewers_disconnected.load(Ordering::Relaxed),
            client_messages: self.client_messages.load(Ordering::Relaxed),
            client_decode_drops: self.client_decode_drops.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录总线报文接收次数。
pub fn record_bus_message() {
    metrics().bus_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功路由并解码的报文次数。
pub fn record_envelope() {
    metrics().envelopes.fetch_add(1, Ordering::Relaxed);
}

/// 记录未知频道丢弃次数。
pub fn record_dropped_unknown_channel() {
    metrics()
        .dropped_unknown_channel
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录桥接端解码失败丢弃次数。
pub fn record_dropped_decode() {
    metrics().dropped_decode.fetch_add(1, Ordering::Relaxed);
}

/// 记录扇出调用次数。
pub fn record_broadcast() {
    metrics().broadcasts.fetch_add(1, Ordering::Relaxed);
}

/// 记录观看端投递成功次数。
pub fn record_delivery() {
    metrics().deliveries.fetch_add(1, Ordering::Relaxed);
}

/// 记录观看端投递丢弃次数（队列满或连接已关闭）。
pub fn record_dropped_delivery() {
    metrics().dropped_deliveries.fetch_add(1, Ordering::Relaxed);
}

/// 记录观看端接入次数。
pub fn record_viewer_connected() {
    metrics().viewers_connected.fetch_add(1, Ordering::Relaxed);
}

/// 记录观看端断开次数。
pub fn record_viewer_disconnected() {
    metrics()
        .viewers_disconnected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录消费端成功解码的报文次数。
pub fn record_client_message() {
    metrics().client_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录消费端解码失败丢弃次数。
pub fn record_client_decode_drop() {
    metrics().client_decode_drops.fetch_add(1, Ordering::Relaxed);
}

/// 记录重连尝试次数。
pub fn record_reconnect_attempt() {
    metrics().reconnect_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录实际发出的告警次数。
pub fn record_alert_fired() {
    metrics().alerts_fired.fetch_add(1, Ordering::Relaxed);
}

/// 记录被冷却窗口抑制的告警次数。
pub fn record_alert_suppressed() {
    metrics().alerts_suppressed.fetch_add(1, Ordering::Relaxed);
}
