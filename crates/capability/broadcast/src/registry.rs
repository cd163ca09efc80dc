//! 观看端注册表与扇出。

use crate::error::BroadcastError;
use domain::Envelope;
use meterlink_telemetry::{record_broadcast, record_delivery, record_dropped_delivery};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 每个观看端的出站队列容量。队列满时该条投递直接丢弃，不排队不阻塞。
pub const VIEWER_QUEUE_CAPACITY: usize = 64;

/// 一次扇出的结果。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

/// 观看端注册表。
///
/// register/unregister 由各连接任务触发，broadcast 由接入回调触发；
/// 两类事件并发触达同一集合，因此用读写锁保护。
pub struct ViewerRegistry {
    viewers: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
        }
    }

    /// 注册一个观看端，返回其出站队列的接收端。
    pub async fn register(&self, viewer_id: Uuid) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(VIEWER_QUEUE_CAPACITY);
        let mut viewers = self.viewers.write().await;
        viewers.insert(viewer_id, tx);
        rx
    }

    /// 移除一个观看端。重复移除是无操作。
    pub async fn unregister(&self, viewer_id: &Uuid) -> bool {
        let mut viewers = self.viewers.write().await;
        viewers.remove(viewer_id).is_some()
    }

    /// 当前在线观看端数量。
    pub async fn len(&self) -> usize {
        self.viewers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.viewers.read().await.is_empty()
    }

    /// 将一个 Envelope 扇出给全部在线观看端。
    ///
    /// 报文只序列化一次；逐个 try_send，队列满或连接已关闭只记为
    /// 该观看端的一次丢弃，绝不中断对其余观看端的投递。
    pub async fn broadcast(&self, envelope: &Envelope) -> Result<BroadcastOutcome, BroadcastError> {
        let text = wire_contract::encode(envelope)
            .map_err(|err| BroadcastError::Encode(err.to_string()))?;
        record_broadcast();

        let viewers = self.viewers.read().await;
        let mut outcome = BroadcastOutcome::default();
        for (viewer_id, sender) in viewers.iter() {
            match sender.try_send(text.clone()) {
                Ok(()) => {
                    record_delivery();
                    outcome.delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    record_dropped_delivery();
                    outcome.dropped += 1;
                    warn!(
                        target: "meterlink.broadcast",
                        viewer = %viewer_id,
                        "viewer_queue_full"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // 连接任务会在自己的清理路径里 unregister
                    record_dropped_delivery();
                    outcome.dropped += 1;
                    debug!(
                        target: "meterlink.broadcast",
                        viewer = %viewer_id,
                        "viewer_queue_closed"
                    );
                }
            }
        }
        Ok(outcome)
    }
}
