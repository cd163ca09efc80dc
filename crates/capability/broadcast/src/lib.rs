//! # 广播能力模块
//!
//! 桥接端面向观看端的一侧：
//! - **ViewerRegistry**：当前在线观看端集合与报文扇出
//! - **WsServer**：WebSocket 监听，任意网络接口接入
//!
//! ## 架构设计
//!
//! ```text
//! EnvelopeHandler (ingest 侧)
//!       │ broadcast(envelope)
//!       ▼
//! ViewerRegistry ── try_send ──► 每观看端出站队列
//!       ▲                              │
//!       │ register/unregister          ▼
//! WsServer 连接任务 ◄────────── WebSocket sink
//! ```
//!
//! 扇出对单条报文只序列化一次；单个观看端的队列满或连接关闭
//! 只记为一次丢弃投递，不影响其余观看端。

mod error;
mod registry;
mod server;

pub use error::BroadcastError;
pub use registry::{BroadcastOutcome, VIEWER_QUEUE_CAPACITY, ViewerRegistry};
pub use server::{WsServer, WsServerConfig};
