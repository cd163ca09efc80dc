//! 桥接端 ↔ 观看端的稳定线上契约。
//!
//! 每条广播一个 JSON 对象：`{"topic", "meterId", "data", "timestamp"}`。
//! 桥接端对一次扇出只编码一次；观看端逐条解码，解码失败即丢弃该条。

use chrono::{DateTime, SecondsFormat, Utc};
use domain::{Envelope, Reading};
use serde::{Deserialize, Serialize};

/// 线上报文。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub topic: String,
    pub meter_id: u32,
    pub data: Reading,
    pub timestamp: String,
}

/// 编解码错误。
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl WireMessage {
    /// 由 Envelope 构造线上报文，时间戳转为 RFC 3339。
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            topic: envelope.source_channel.clone(),
            meter_id: envelope.meter_id,
            data: envelope.reading,
            timestamp: rfc3339_from_epoch_ms(envelope.observed_at_ms),
        }
    }
}

/// 将一个 Envelope 编码为一条线上报文文本。
pub fn encode(envelope: &Envelope) -> Result<String, WireError> {
    serde_json::to_string(&WireMessage::from_envelope(envelope))
        .map_err(|err| WireError::Encode(err.to_string()))
}

/// 解码一条线上报文文本。
pub fn decode(text: &str) -> Result<WireMessage, WireError> {
    serde_json::from_str(text).map_err(|err| WireError::Decode(err.to_string()))
}

/// epoch 毫秒 → RFC 3339（UTC、毫秒精度）。超出可表示范围时回退到纪元零点。
fn rfc3339_from_epoch_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::rfc3339_from_epoch_ms;

    #[test]
    fn epoch_zero_formats_as_utc() {
        assert_eq!(rfc3339_from_epoch_ms(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn millisecond_precision_is_kept() {
        assert_eq!(rfc3339_from_epoch_ms(1_500), "1970-01-01T00:00:01.500Z");
    }
}
