//! 广播错误类型定义

/// 广播链路错误
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket 握手错误
    #[error("handshake error: {0}")]
    Handshake(String),

    /// 报文编码错误
    #[error("encode error: {0}")]
    Encode(String),
}
