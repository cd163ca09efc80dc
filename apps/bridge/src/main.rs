//! MQTT → WebSocket 桥接进程。
//!
//! 订阅传感器总线的固定频道集，把每条解码成功的抄表样本扇出给
//! 全部在线观看端。总线连接错误对进程是致命的，由外部监管重启；
//! 单条报文的解码失败只丢弃该条。

use domain::{ChannelTable, Envelope};
use meterlink_broadcast::{ViewerRegistry, WsServer, WsServerConfig};
use meterlink_config::BridgeConfig;
use meterlink_ingest::{EnvelopeHandler, IngestError, MqttSource, MqttSourceConfig, Source};
use meterlink_telemetry::init_tracing;
use std::sync::Arc;
use tracing::{info, warn};

/// 扇出处理器
///
/// 实现 `EnvelopeHandler` 接口，把接入侧产出的每个 Envelope
/// 广播给注册表中的全部观看端。
struct BroadcastHandler {
    registry: Arc<ViewerRegistry>,
}

#[async_trait::async_trait]
impl EnvelopeHandler for BroadcastHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), IngestError> {
        info!(
            target: "meterlink.bridge",
            channel = %envelope.source_channel,
            meter_id = envelope.meter_id,
            observed_at_ms = envelope.observed_at_ms,
            "reading_received"
        );

        let outcome = self
            .registry
            .broadcast(&envelope)
            .await
            .map_err(|err| IngestError::Handler(err.to_string()))?;

        info!(
            target: "meterlink.bridge",
            channel = %envelope.source_channel,
            meter_id = envelope.meter_id,
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            "reading_broadcast"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = BridgeConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let registry = Arc::new(ViewerRegistry::new());

    // 观看端监听：任意网络接口接入
    let server = WsServer::new(
        WsServerConfig {
            listen_addr: config.ws_listen_addr.clone(),
        },
        Arc::clone(&registry),
    );
    tokio::spawn(async move {
        if let Err(err) = server.run().await {
            warn!(target: "meterlink.bridge", error = %err, "ws server stopped");
        }
    });

    // 传感器总线接入
    let table = ChannelTable::new(config.channels.clone());
    info!(
        target: "meterlink.bridge",
        broker = %format!("{}:{}", config.mqtt_host, config.mqtt_port),
        channels = table.len(),
        listen = %config.ws_listen_addr,
        "bridge starting"
    );
    let source = MqttSource::new(
        MqttSourceConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
        },
        table,
    );
    let handler = Arc::new(BroadcastHandler { registry });

    // 总线连接错误到达这里即退出进程，交给外部监管重启
    source.run(handler).await?;
    Ok(())
}
