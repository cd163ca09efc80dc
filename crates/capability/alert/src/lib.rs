//! 阈值告警。
//!
//! 对每条抄表样本执行固定规则集：电压为零、功率因数偏低。
//! 以 (电表 ID, 告警种类) 为粒度在冷却窗口内抑制重复告警；
//! 只有实际发出的告警才更新抑制表。告警出口是两个外部协作者：
//! 推送通知与等待用户确认的即时弹窗。

use domain::Reading;
use meterlink_telemetry::{record_alert_fired, record_alert_suppressed};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// 告警种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    VoltageZero,
    LowPowerFactor,
}

impl AlertKind {
    /// 元数据中使用的稳定类型名。
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::VoltageZero => "voltage_alert",
            AlertKind::LowPowerFactor => "power_factor_alert",
        }
    }
}

/// 推送通知出口（外部投递协作者的契约）。
pub trait AlertNotifier: Send + Sync {
    fn push(&self, title: &str, body: &str, metadata: &serde_json::Value);
}

/// 即时弹窗出口（等待用户确认的同步告警）。
pub trait AlertPrompter: Send + Sync {
    fn prompt(&self, title: &str, body: &str);
}

/// 日志推送出口（用于接线与本地运行）。
#[derive(Debug, Default)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn push(&self, title: &str, body: &str, metadata: &serde_json::Value) {
        warn!(
            target: "meterlink.alert",
            title = %title,
            body = %body,
            metadata = %metadata,
            "alert_push"
        );
    }
}

/// 日志弹窗出口（用于接线与本地运行）。
#[derive(Debug, Default)]
pub struct LogPrompter;

impl AlertPrompter for LogPrompter {
    fn prompt(&self, title: &str, body: &str) {
        warn!(
            target: "meterlink.alert",
            title = %title,
            body = %body,
            "alert_prompt"
        );
    }
}

/// 告警规则参数。
#[derive(Debug, Clone, Copy)]
pub struct AlertRules {
    /// 功率因数告警阈值：0 < pf < 该值时触发。
    pub pf_threshold: f64,
    /// 同一 (电表, 种类) 两次告警之间的最小间隔。
    pub cooldown: Duration,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            pf_threshold: 0.85,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// 告警引擎。
///
/// 评估除更新抑制表与两次出口调用外没有副作用，不修改样本本身。
pub struct AlertEngine {
    rules: AlertRules,
    suppression: Mutex<HashMap<(u32, AlertKind), i64>>,
    notifier: Arc<dyn AlertNotifier>,
    prompter: Arc<dyn AlertPrompter>,
}

impl AlertEngine {
    pub fn new(notifier: Arc<dyn AlertNotifier>, prompter: Arc<dyn AlertPrompter>) -> Self {
        Self::with_rules(AlertRules::default(), notifier, prompter)
    }

    pub fn with_rules(
        rules: AlertRules,
        notifier: Arc<dyn AlertNotifier>,
        prompter: Arc<dyn AlertPrompter>,
    ) -> Self {
        Self {
            rules,
            suppression: Mutex::new(HashMap::new()),
            notifier,
            prompter,
        }
    }

    /// 以当前时间评估一条样本。
    pub fn evaluate(&self, meter_id: u32, meter_name: &str, reading: &Reading) {
        self.evaluate_at(meter_id, meter_name, reading, now_epoch_ms());
    }

    /// 以显式时间评估（测试的时钟注入口）。
    pub fn evaluate_at(&self, meter_id: u32, meter_name: &str, reading: &Reading, now_ms: i64) {
        if matches!(reading.voltage, Some(voltage) if voltage == 0.0) {
            self.fire(
                meter_id,
                AlertKind::VoltageZero,
                "Voltage Alert",
                &format!(
                    "{}: Voltage has dropped to 0V! Check electrical connection.",
                    meter_name
                ),
                &format!(
                    "{}: Voltage has dropped to 0V! Possible power outage, disconnected \
                     cables or a tripped breaker. Check the electrical connection immediately.",
                    meter_name
                ),
                serde_json::json!({
                    "type": AlertKind::VoltageZero.as_str(),
                    "meterId": meter_id,
                    "meterName": meter_name,
                }),
                now_ms,
            );
        }

        if let Some(pf) = reading.pf {
            if pf > 0.0 && pf < self.rules.pf_threshold {
                let percent = (pf * 100.0).round() as i64;
                self.fire(
                    meter_id,
                    AlertKind::LowPowerFactor,
                    "Low Power Factor Alert",
                    &format!(
                        "{}: Power Factor is {} ({}%) - Below optimal range!",
                        meter_name, pf, percent
                    ),
                    &format!(
                        "{}: Power Factor is {} ({}%). Optimal range is 0.85 (85%) or \
                         higher; sustained low power factor raises electricity costs and \
                         equipment load.",
                        meter_name, pf, percent
                    ),
                    serde_json::json!({
                        "type": AlertKind::LowPowerFactor.as_str(),
                        "meterId": meter_id,
                        "meterName": meter_name,
                        "powerFactor": pf,
                    }),
                    now_ms,
                );
            }
        }
    }

    /// 清空抑制表（用于测试）。
    pub fn reset(&self) {
        self.locked_suppression().clear();
    }

    fn fire(
        &self,
        meter_id: u32,
        kind: AlertKind,
        title: &str,
        body: &str,
        prompt_body: &str,
        metadata: serde_json::Value,
        now_ms: i64,
    ) {
        let cooldown_ms = self.rules.cooldown.as_millis() as i64;
        let suppressed = {
            let mut table = self.locked_suppression();
            let last_fired = table.get(&(meter_id, kind)).copied();
            match last_fired {
                Some(last_fired) if now_ms.saturating_sub(last_fired) < cooldown_ms => true,
                _ => {
                    // 只有实际发出时才推进时间戳
                    table.insert((meter_id, kind), now_ms);
                    false
                }
            }
        };

        if suppressed {
            record_alert_suppressed();
            debug!(
                target: "meterlink.alert",
                meter_id = meter_id,
                kind = kind.as_str(),
                "alert_suppressed"
            );
            return;
        }

        record_alert_fired();
        warn!(
            target: "meterlink.alert",
            meter_id = meter_id,
            kind = kind.as_str(),
            "alert_fired"
        );
        self.notifier.push(title, body, &metadata);
        self.prompter.prompt(title, prompt_body);
    }

    fn locked_suppression(&self) -> MutexGuard<'_, HashMap<(u32, AlertKind), i64>> {
        match self.suppression.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
