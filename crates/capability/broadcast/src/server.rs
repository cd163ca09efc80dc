//! WebSocket 监听端
//!
//! 在配置地址上接受观看端连接，为每个连接分配标识并注册到
//! ViewerRegistry；连接关闭或出错时立即移除。

use crate::error::BroadcastError;
use crate::registry::ViewerRegistry;
use futures_util::{SinkExt, StreamExt};
use meterlink_telemetry::{record_viewer_connected, record_viewer_disconnected};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};
use uuid::Uuid;

/// WebSocket 监听配置。
#[derive(Debug, Clone)]
pub struct WsServerConfig {
    /// 监听地址，默认绑定全部网络接口。
    pub listen_addr: String,
}

/// 观看端接入服务。
pub struct WsServer {
    config: WsServerConfig,
    registry: Arc<ViewerRegistry>,
}

impl WsServer {
    pub fn new(config: WsServerConfig, registry: Arc<ViewerRegistry>) -> Self {
        Self { config, registry }
    }

    /// 运行监听循环。单个连接的握手或读写失败不会停止监听。
    pub async fn run(&self) -> Result<(), BroadcastError> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!(
            target: "meterlink.broadcast",
            addr = %self.config.listen_addr,
            "ws server listening"
        );

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, registry).await {
                            warn!(
                                target: "meterlink.broadcast",
                                peer = %peer_addr,
                                error = %err,
                                "viewer connection error"
                            );
                        }
                    });
                }
                Err(err) => {
                    error!(
                        target: "meterlink.broadcast",
                        error = %err,
                        "failed to accept connection"
                    );
                }
            }
        }
    }
}

/// 处理单个观看端连接，返回前保证已从注册表移除。
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<ViewerRegistry>,
) -> Result<(), BroadcastError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|err| BroadcastError::Handshake(err.to_string()))?;

    let viewer_id = Uuid::new_v4();
    let mut outbound = registry.register(viewer_id).await;
    record_viewer_connected();
    info!(target: "meterlink.broadcast", viewer = %viewer_id, "viewer connected");

    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            queued = outbound.recv() => {
                match queued {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // 观看端是纯接收方，入站数据帧不参与协议
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(
                            target: "meterlink.broadcast",
                            viewer = %viewer_id,
                            error = %err,
                            "viewer socket error"
                        );
                        break;
                    }
                }
            }
        }
    }

    registry.unregister(&viewer_id).await;
    record_viewer_disconnected();
    info!(target: "meterlink.broadcast", viewer = %viewer_id, "viewer disconnected");
    Ok(())
}
