use meterlink_client::{ConnectionState, FailureDisposition, ReconnectMachine, RetryPolicy};
use std::time::Duration;

fn machine() -> ReconnectMachine {
    ReconnectMachine::new(RetryPolicy::default())
}

#[test]
fn connect_moves_disconnected_to_connecting() {
    let mut machine = machine();
    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert!(machine.connect_requested());
    assert_eq!(machine.state(), ConnectionState::Connecting);
}

#[test]
fn open_resets_attempt_counter() {
    let mut machine = machine();
    machine.connect_requested();
    assert_eq!(machine.on_failure(), Some(FailureDisposition::RetryAfter(Duration::from_secs(3))));
    assert!(machine.retry_tick());
    assert!(machine.on_open());

    assert_eq!(machine.state(), ConnectionState::Connected);
    assert_eq!(machine.attempts(), 0);
}

#[test]
fn five_consecutive_failures_reach_failed() {
    let mut machine = machine();
    machine.connect_requested();

    for _ in 0..4 {
        assert_eq!(
            machine.on_failure(),
            Some(FailureDisposition::RetryAfter(Duration::from_secs(3)))
        );
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
        assert!(machine.retry_tick());
        assert_eq!(machine.state(), ConnectionState::Connecting);
    }

    assert_eq!(machine.on_failure(), Some(FailureDisposition::GiveUp));
    assert_eq!(machine.state(), ConnectionState::Failed);
}

#[test]
fn connect_after_failed_restarts_the_cycle() {
    let mut machine = machine();
    machine.connect_requested();
    for _ in 0..4 {
        machine.on_failure();
        machine.retry_tick();
    }
    machine.on_failure();
    assert_eq!(machine.state(), ConnectionState::Failed);

    // 终态只能由外部 connect() 解除
    assert!(machine.connect_requested());
    assert_eq!(machine.state(), ConnectionState::Connecting);
    assert_eq!(machine.attempts(), 0);
}

#[test]
fn failed_is_terminal_without_connect() {
    let mut machine = machine();
    machine.connect_requested();
    for _ in 0..4 {
        machine.on_failure();
        machine.retry_tick();
    }
    machine.on_failure();

    assert_eq!(machine.on_failure(), None);
    assert!(!machine.retry_tick());
    assert!(!machine.on_open());
    assert_eq!(machine.state(), ConnectionState::Failed);
}

#[test]
fn connect_is_ignored_while_active() {
    let mut machine = machine();
    machine.connect_requested();
    assert!(!machine.connect_requested());

    machine.on_open();
    assert!(!machine.connect_requested());

    machine.on_failure();
    assert_eq!(machine.state(), ConnectionState::Reconnecting);
    assert!(!machine.connect_requested());
}

#[test]
fn retry_delay_is_fixed_not_backing_off() {
    let policy = RetryPolicy {
        max_attempts: 4,
        retry_delay: Duration::from_millis(250),
    };
    let mut machine = ReconnectMachine::new(policy);
    machine.connect_requested();

    for _ in 0..3 {
        assert_eq!(
            machine.on_failure(),
            Some(FailureDisposition::RetryAfter(Duration::from_millis(250)))
        );
        machine.retry_tick();
    }
}

#[test]
fn counter_restarts_after_successful_open() {
    let mut machine = machine();
    machine.connect_requested();

    // 失败四次后成功，计数清零
    for _ in 0..4 {
        machine.on_failure();
        machine.retry_tick();
    }
    assert!(machine.on_open());

    // 再断开时重新拥有完整的重试额度
    assert_eq!(
        machine.on_failure(),
        Some(FailureDisposition::RetryAfter(Duration::from_secs(3)))
    );
    assert_eq!(machine.attempts(), 1);
}

#[test]
fn disconnect_returns_to_disconnected_from_any_state() {
    let mut machine = machine();
    machine.connect_requested();
    machine.on_open();

    machine.disconnect();
    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(machine.attempts(), 0);
}
