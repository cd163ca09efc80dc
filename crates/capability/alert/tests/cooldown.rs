use domain::Reading;
use meterlink_alert::{AlertEngine, AlertNotifier, AlertPrompter};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingNotifier {
    pushes: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl AlertNotifier for RecordingNotifier {
    fn push(&self, title: &str, body: &str, metadata: &serde_json::Value) {
        self.pushes
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), metadata.clone()));
    }
}

impl RecordingNotifier {
    fn pushes(&self) -> Vec<(String, String, serde_json::Value)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct RecordingPrompter {
    prompts: Mutex<Vec<(String, String)>>,
}

impl AlertPrompter for RecordingPrompter {
    fn prompt(&self, title: &str, body: &str) {
        self.prompts
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

impl RecordingPrompter {
    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

fn engine() -> (AlertEngine, Arc<RecordingNotifier>, Arc<RecordingPrompter>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let prompter = Arc::new(RecordingPrompter::default());
    let engine = AlertEngine::new(notifier.clone(), prompter.clone());
    (engine, notifier, prompter)
}

fn voltage_zero() -> Reading {
    Reading {
        voltage: Some(0.0),
        ..Reading::default()
    }
}

#[test]
fn first_occurrence_fires_both_rules() {
    let (engine, notifier, prompter) = engine();
    let reading = Reading {
        voltage: Some(0.0),
        pf: Some(0.6),
        ..Reading::default()
    };

    engine.evaluate_at(2, "Meter 2", &reading, 0);

    let pushes = notifier.pushes();
    assert_eq!(pushes.len(), 2);
    assert_eq!(prompter.prompts().len(), 2);

    let kinds: Vec<&str> = pushes
        .iter()
        .filter_map(|(_, _, metadata)| metadata["type"].as_str())
        .collect();
    assert!(kinds.contains(&"voltage_alert"));
    assert!(kinds.contains(&"power_factor_alert"));
    for (_, _, metadata) in &pushes {
        assert_eq!(metadata["meterId"], 2);
        assert_eq!(metadata["meterName"], "Meter 2");
    }
}

#[test]
fn repeat_within_cooldown_is_suppressed() {
    let (engine, notifier, _prompter) = engine();

    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 0);
    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 29_999);
    assert_eq!(notifier.pushes().len(), 1);

    // 恰好冷却到期即可再次发出
    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 30_000);
    assert_eq!(notifier.pushes().len(), 2);
}

#[test]
fn suppression_is_per_meter_and_kind() {
    let (engine, notifier, _prompter) = engine();

    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 0);
    engine.evaluate_at(2, "Meter 2", &voltage_zero(), 1_000);
    assert_eq!(notifier.pushes().len(), 2);

    // 同一电表的另一种告警不受电压告警的冷却影响
    let low_pf = Reading {
        pf: Some(0.5),
        ..Reading::default()
    };
    engine.evaluate_at(1, "Meter 1", &low_pf, 2_000);
    assert_eq!(notifier.pushes().len(), 3);
}

#[test]
fn suppressed_evaluation_does_not_extend_cooldown() {
    let (engine, notifier, _prompter) = engine();

    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 0);
    // 抑制窗口内的评估不推进时间戳
    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 29_000);
    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 31_000);

    assert_eq!(notifier.pushes().len(), 2);
}

#[test]
fn reset_clears_suppression_table() {
    let (engine, notifier, _prompter) = engine();

    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 0);
    engine.reset();
    engine.evaluate_at(1, "Meter 1", &voltage_zero(), 1);

    assert_eq!(notifier.pushes().len(), 2);
}

#[test]
fn healthy_reading_fires_nothing() {
    let (engine, notifier, prompter) = engine();
    let healthy = Reading {
        voltage: Some(230.1),
        pf: Some(0.95),
        ..Reading::default()
    };

    engine.evaluate_at(1, "Meter 1", &healthy, 0);

    assert!(notifier.pushes().is_empty());
    assert!(prompter.prompts().is_empty());
}

#[test]
fn power_factor_rule_bounds_are_strict() {
    let (engine, notifier, _prompter) = engine();

    // pf == 0 不触发（0 < pf 为严格下界）
    let zero_pf = Reading {
        pf: Some(0.0),
        ..Reading::default()
    };
    engine.evaluate_at(1, "Meter 1", &zero_pf, 0);
    assert!(notifier.pushes().is_empty());

    // pf == 阈值不触发（上界同样严格）
    let at_threshold = Reading {
        pf: Some(0.85),
        ..Reading::default()
    };
    engine.evaluate_at(1, "Meter 1", &at_threshold, 0);
    assert!(notifier.pushes().is_empty());

    let below = Reading {
        pf: Some(0.84),
        ..Reading::default()
    };
    engine.evaluate_at(1, "Meter 1", &below, 0);
    assert_eq!(notifier.pushes().len(), 1);
}

#[test]
fn absent_fields_fire_nothing() {
    let (engine, notifier, _prompter) = engine();

    engine.evaluate_at(1, "Meter 1", &Reading::default(), 0);
    assert!(notifier.pushes().is_empty());
}

#[test]
fn push_metadata_carries_offending_value() {
    let (engine, notifier, _prompter) = engine();
    let reading = Reading {
        pf: Some(0.6),
        ..Reading::default()
    };

    engine.evaluate_at(3, "Meter 3", &reading, 0);

    let pushes = notifier.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].2["powerFactor"], 0.6);
    assert!(pushes[0].1.contains("0.6"));
}
