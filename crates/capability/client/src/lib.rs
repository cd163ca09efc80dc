//! # 消费端连接能力模块
//!
//! 持有一条到桥接端的外连 WebSocket，向本地观察者提供
//! 发布/订阅接口，并实现有界重试的断线重连：
//!
//! - **ReconnectMachine**：不做 I/O 的显式状态机，
//!   传输事件进、状态迁移出
//! - **ObserverRegistry**：按订阅句柄管理的观察者注册表，
//!   移除幂等
//! - **LinkManager**：显式构造的服务对象，驱动拨号、
//!   读循环与固定间隔重试
//!
//! 状态迁移同步通知状态观察者；入站报文解码失败只丢弃该条，
//! 从不上抛给报文观察者。

mod manager;
mod observers;
mod state;

pub use manager::{LinkManager, MessageObserver, StatusObserver};
pub use observers::{ObserverRegistry, SubscriptionId};
pub use state::{ConnectionState, FailureDisposition, ReconnectMachine, RetryPolicy};
