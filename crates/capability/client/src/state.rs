//! 重连状态机。

use std::fmt;
use std::time::Duration;

/// 连接状态。每个 LinkManager 恰有一份，仅由其自身驱动迁移。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// 状态的稳定显示名，通知观察者时使用。
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::Failed => "Failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 重连策略：固定次数上限与固定间隔，不做指数退避。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// 一次连接失败的处置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// 固定间隔后重试。
    RetryAfter(Duration),
    /// 连续失败达到上限，进入终态 Failed。
    GiveUp,
}

/// 显式驱动的重连状态机。
///
/// 机器本身不做任何 I/O：传输层事件作为输入，状态迁移作为输出，
/// 由驱动任务据此执行拨号、读循环与定时重试。
#[derive(Debug)]
pub struct ReconnectMachine {
    state: ConnectionState,
    attempts: u32,
    policy: RetryPolicy,
}

impl ReconnectMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 外部 connect() 请求。仅在 Disconnected / Failed 生效，
    /// 清零失败计数并进入 Connecting。
    pub fn connect_requested(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed => {
                self.attempts = 0;
                self.state = ConnectionState::Connecting;
                true
            }
            _ => false,
        }
    }

    /// 握手成功：Connecting → Connected，失败计数清零。
    pub fn on_open(&mut self) -> bool {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
            self.attempts = 0;
            true
        } else {
            false
        }
    }

    /// 连接失败或断开。连续第 max_attempts 次失败进入终态 Failed，
    /// 否则进入 Reconnecting 并在固定间隔后重试。
    pub fn on_failure(&mut self) -> Option<FailureDisposition> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.attempts += 1;
                if self.attempts >= self.policy.max_attempts {
                    self.state = ConnectionState::Failed;
                    Some(FailureDisposition::GiveUp)
                } else {
                    self.state = ConnectionState::Reconnecting;
                    Some(FailureDisposition::RetryAfter(self.policy.retry_delay))
                }
            }
            _ => None,
        }
    }

    /// 重连定时器到期：Reconnecting → Connecting。
    pub fn retry_tick(&mut self) -> bool {
        if self.state == ConnectionState::Reconnecting {
            self.state = ConnectionState::Connecting;
            true
        } else {
            false
        }
    }

    /// 外部 disconnect()：任何状态立即回到 Disconnected。
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
    }
}
