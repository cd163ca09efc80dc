//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 桥接进程配置。
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    /// (频道名, 电表 ID) 列表，即订阅的全部频道。
    pub channels: Vec<(String, u32)>,
    pub ws_listen_addr: String,
}

/// 消费端进程配置。
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub bridge_url: String,
}

impl BridgeConfig {
    /// 从环境变量读取配置，全部键均有默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        let mqtt_host =
            env::var("METERLINK_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("METERLINK_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("METERLINK_MQTT_USERNAME");
        let mqtt_password = read_optional("METERLINK_MQTT_PASSWORD");
        let channels_raw = env::var("METERLINK_CHANNELS")
            .unwrap_or_else(|_| "pzem1/all=1,pzem2/all=2,pzem3/all=3".to_string());
        let channels = parse_channel_table(&channels_raw)
            .map_err(|reason| ConfigError::Invalid("METERLINK_CHANNELS".to_string(), reason))?;
        let ws_listen_addr =
            env::var("METERLINK_WS_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            channels,
            ws_listen_addr,
        })
    }
}

impl WatchConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let bridge_url = env::var("METERLINK_BRIDGE_URL")
            .unwrap_or_else(|_| "ws://127.0.0.1:8080".to_string());
        Ok(Self { bridge_url })
    }
}

/// 解析频道表文本：`name=id` 逗号分隔，如 `pzem1/all=1,pzem2/all=2`。
pub fn parse_channel_table(raw: &str) -> Result<Vec<(String, u32)>, String> {
    let mut entries = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let Some((name, id)) = item.split_once('=') else {
            return Err(format!("missing '=' in '{}'", item));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty channel name in '{}'", item));
        }
        let meter_id = id
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid meter id in '{}'", item))?;
        entries.push((name.to_string(), meter_id));
    }
    if entries.is_empty() {
        return Err("no channels configured".to_string());
    }
    Ok(entries)
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
