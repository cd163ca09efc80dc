use serde::{Deserialize, Serialize};

/// 一次抄表采样。所有字段均可缺省，缺省字段不参与序列化。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thd: Option<f64>,
}

/// 路由标注后的广播载体。仅存在于一次扇出期间，不做持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source_channel: String,
    pub meter_id: u32,
    pub reading: Reading,
    pub observed_at_ms: i64,
}
