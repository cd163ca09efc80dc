//! 消费端进程。
//!
//! 连接桥接端，打印连接状态迁移，并把每条抄表样本交给
//! 阈值告警引擎。断线后按固定间隔重连，连续失败达到上限
//! 进入 Failed，需要重新启动连接。

use meterlink_alert::{AlertEngine, LogNotifier, LogPrompter};
use meterlink_client::{
    ConnectionState, LinkManager, MessageObserver, RetryPolicy, StatusObserver,
};
use meterlink_config::WatchConfig;
use meterlink_telemetry::init_tracing;
use std::sync::Arc;
use tracing::info;
use wire_contract::WireMessage;

/// 状态观察者：把每次迁移写入日志。
struct StatusLogger;

impl StatusObserver for StatusLogger {
    fn on_status(&self, state: ConnectionState) {
        info!(target: "meterlink.watch", status = state.as_str(), "link_status");
    }
}

/// 报文观察者：记录抄表值并驱动告警引擎。
struct AlertingObserver {
    engine: AlertEngine,
}

impl MessageObserver for AlertingObserver {
    fn on_message(&self, message: &WireMessage) {
        info!(
            target: "meterlink.watch",
            topic = %message.topic,
            meter_id = message.meter_id,
            voltage = ?message.data.voltage,
            power = ?message.data.power,
            pf = ?message.data.pf,
            timestamp = %message.timestamp,
            "reading"
        );
        let meter_name = format!("Meter {}", message.meter_id);
        self.engine
            .evaluate(message.meter_id, &meter_name, &message.data);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = WatchConfig::from_env()?;
    init_tracing();

    let manager = LinkManager::new(config.bridge_url.clone(), RetryPolicy::default());
    manager.add_status_observer(Arc::new(StatusLogger));

    let engine = AlertEngine::new(Arc::new(LogNotifier), Arc::new(LogPrompter));
    manager.add_message_observer(Arc::new(AlertingObserver { engine }));

    info!(target: "meterlink.watch", url = %config.bridge_url, "watch starting");
    manager.connect();

    tokio::signal::ctrl_c().await?;
    manager.disconnect();
    Ok(())
}
