//! 传感器总线接入。
//!
//! 与 MQTT 总线保持一条连接，启动时订阅配置的全部频道；
//! 每条报文经路由与解码后产出一个 Envelope 交给处理器。
//! 解码失败只丢弃该条报文，连接级错误对桥接进程是致命的（由外部监管重启）。

use async_trait::async_trait;
use domain::{ChannelTable, Envelope, Reading};
use meterlink_telemetry::{
    record_bus_message, record_dropped_decode, record_dropped_unknown_channel, record_envelope,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// Envelope 处理器。
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn EnvelopeHandler>) -> Result<(), IngestError>;
}

/// 占位源（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopSource;

#[async_trait]
impl Source for NoopSource {
    async fn run(&self, _handler: Arc<dyn EnvelopeHandler>) -> Result<(), IngestError> {
        Ok(())
    }
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// MQTT 采集源。
pub struct MqttSource {
    config: MqttSourceConfig,
    table: ChannelTable,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig, table: ChannelTable) -> Self {
        Self { config, table }
    }

    pub fn table(&self) -> &ChannelTable {
        &self.table
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn EnvelopeHandler>) -> Result<(), IngestError> {
        let client_id = format!("meterlink-bridge-{}", uuid::Uuid::new_v4());
        let mut options =
            rumqttc::MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 10);
        for channel in self.table.channels() {
            client
                .subscribe(channel, rumqttc::QoS::AtMostOnce)
                .await
                .map_err(|err| IngestError::Source(err.to_string()))?;
        }

        loop {
            match eventloop.poll().await {
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                    record_bus_message();
                    let envelope = match envelope_from_publish(
                        &self.table,
                        &publish.topic,
                        &publish.payload,
                        now_epoch_ms(),
                    ) {
                        Ok(envelope) => envelope,
                        Err(PublishDrop::UnknownChannel) => {
                            record_dropped_unknown_channel();
                            warn!(
                                target: "meterlink.ingest",
                                topic = %publish.topic,
                                "channel_skipped"
                            );
                            continue;
                        }
                        Err(PublishDrop::Decode(reason)) => {
                            record_dropped_decode();
                            warn!(
                                target: "meterlink.ingest",
                                topic = %publish.topic,
                                error = %reason,
                                "payload_decode_failed"
                            );
                            continue;
                        }
                    };
                    record_envelope();
                    if let Err(err) = handler.handle(envelope).await {
                        warn!(target: "meterlink.ingest", error = %err, "envelope handler failed");
                    }
                }
                Ok(_) => {}
                Err(err) => return Err(IngestError::Source(err.to_string())),
            }
        }
    }
}

/// 单条报文的丢弃原因。
#[derive(Debug, PartialEq)]
pub enum PublishDrop {
    UnknownChannel,
    Decode(String),
}

/// 将一条 Publish 报文路由并解码为 Envelope。
///
/// 未知频道与解码失败都在这里拦下，二者都不会到达扇出。
pub fn envelope_from_publish(
    table: &ChannelTable,
    topic: &str,
    payload: &[u8],
    now_ms: i64,
) -> Result<Envelope, PublishDrop> {
    let meter_id = table.route(topic).ok_or(PublishDrop::UnknownChannel)?;
    let reading: Reading =
        serde_json::from_slice(payload).map_err(|err| PublishDrop::Decode(err.to_string()))?;
    Ok(Envelope {
        source_channel: topic.to_string(),
        meter_id,
        reading,
        observed_at_ms: now_ms,
    })
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
