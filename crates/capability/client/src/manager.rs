//! 消费端连接管理。

use crate::observers::{ObserverRegistry, SubscriptionId};
use crate::state::{ConnectionState, FailureDisposition, ReconnectMachine, RetryPolicy};
use futures_util::StreamExt;
use meterlink_telemetry::{
    record_client_decode_drop, record_client_message, record_reconnect_attempt,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use wire_contract::WireMessage;

/// 连接状态观察者。每次状态迁移被同步通知一次。
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, state: ConnectionState);
}

/// 报文观察者。每条解码成功的线上报文被通知一次。
pub trait MessageObserver: Send + Sync {
    fn on_message(&self, message: &WireMessage);
}

struct LinkShared {
    url: String,
    machine: Mutex<ReconnectMachine>,
    status_observers: ObserverRegistry<dyn StatusObserver>,
    message_observers: ObserverRegistry<dyn MessageObserver>,
}

impl LinkShared {
    fn locked_machine(&self) -> MutexGuard<'_, ReconnectMachine> {
        match self.machine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify_status(&self, state: ConnectionState) {
        self.status_observers
            .notify_each(|observer| observer.on_status(state));
    }
}

/// 与桥接端的连接管理器。
///
/// 显式构造的服务对象：一个实例拥有一条外连、一份状态机与
/// 两个互相独立的观察者注册表，不提供进程级全局实例。
/// 重连目标地址即构造时的固定地址。
pub struct LinkManager {
    shared: Arc<LinkShared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl LinkManager {
    pub fn new(url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            shared: Arc::new(LinkShared {
                url: url.into(),
                machine: Mutex::new(ReconnectMachine::new(policy)),
                status_observers: ObserverRegistry::new(),
                message_observers: ObserverRegistry::new(),
            }),
            driver: Mutex::new(None),
        }
    }

    /// 当前连接状态。
    pub fn state(&self) -> ConnectionState {
        self.shared.locked_machine().state()
    }

    pub fn add_status_observer(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionId {
        self.shared.status_observers.subscribe(observer)
    }

    /// 移除状态观察者。句柄未注册时是无操作。
    pub fn remove_status_observer(&self, id: SubscriptionId) -> bool {
        self.shared.status_observers.unsubscribe(id)
    }

    pub fn add_message_observer(&self, observer: Arc<dyn MessageObserver>) -> SubscriptionId {
        self.shared.message_observers.subscribe(observer)
    }

    /// 移除报文观察者。句柄未注册时是无操作。
    pub fn remove_message_observer(&self, id: SubscriptionId) -> bool {
        self.shared.message_observers.unsubscribe(id)
    }

    /// 发起连接。仅在 Disconnected / Failed 状态生效；
    /// 迁移到 Connecting 被同步通知，随后驱动任务在后台拨号。
    pub fn connect(&self) {
        let started = self.shared.locked_machine().connect_requested();
        if !started {
            return;
        }
        self.shared.notify_status(ConnectionState::Connecting);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(drive(shared));
        let mut driver = match self.driver.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 到达这里旧驱动必然已随 Failed / Disconnected 终止
        if let Some(old) = driver.replace(handle) {
            old.abort();
        }
    }

    /// 立即断开：终止驱动任务（连同尚未到期的重试定时器），
    /// 回到 Disconnected 并清空两类观察者注册表；
    /// 不等待对端确认即丢弃底层连接。
    pub fn disconnect(&self) {
        let handle = {
            let mut driver = match self.driver.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            driver.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        self.shared.locked_machine().disconnect();
        self.shared.status_observers.clear();
        self.shared.message_observers.clear();
        info!(target: "meterlink.client", "link disconnected");
    }
}

/// 驱动循环：拨号 → 读循环 → 失败处置 → 固定间隔重试。
async fn drive(shared: Arc<LinkShared>) {
    loop {
        // 进入此处时状态机处于 Connecting
        match tokio_tungstenite::connect_async(shared.url.as_str()).await {
            Ok((ws, _response)) => {
                if !shared.locked_machine().on_open() {
                    return;
                }
                info!(target: "meterlink.client", url = %shared.url, "link connected");
                shared.notify_status(ConnectionState::Connected);
                read_messages(&shared, ws).await;
                warn!(target: "meterlink.client", url = %shared.url, "link closed");
            }
            Err(err) => {
                warn!(
                    target: "meterlink.client",
                    url = %shared.url,
                    error = %err,
                    "link connect failed"
                );
            }
        }

        // 先取出处置再驱动定时器，锁不跨越 await 点
        let disposition = shared.locked_machine().on_failure();
        match disposition {
            Some(FailureDisposition::RetryAfter(delay)) => {
                shared.notify_status(ConnectionState::Reconnecting);
                record_reconnect_attempt();
                tokio::time::sleep(delay).await;
                if !shared.locked_machine().retry_tick() {
                    return;
                }
                shared.notify_status(ConnectionState::Connecting);
            }
            Some(FailureDisposition::GiveUp) => {
                warn!(
                    target: "meterlink.client",
                    url = %shared.url,
                    "max reconnect attempts reached"
                );
                shared.notify_status(ConnectionState::Failed);
                return;
            }
            None => return,
        }
    }
}

/// 读循环：逐条解码线上报文并分发给报文观察者。
/// 解码失败只丢弃该条，从不上抛给观察者。
async fn read_messages(shared: &LinkShared, mut ws: WebSocketStream<MaybeTlsStream<TcpStream>>) {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => match wire_contract::decode(&text) {
                Ok(message) => {
                    record_client_message();
                    shared
                        .message_observers
                        .notify_each(|observer| observer.on_message(&message));
                }
                Err(err) => {
                    record_client_decode_drop();
                    warn!(
                        target: "meterlink.client",
                        error = %err,
                        "message_decode_failed"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(target: "meterlink.client", error = %err, "link socket error");
                break;
            }
        }
    }
}
