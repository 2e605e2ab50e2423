//! 警告输出
//!
//! 上报链路中的失败不能影响测试运行，只记录警告。警告通过注入的 `WarningSink` 输出，
//! 默认转发到 tracing，测试中可以用 `RecordingWarnings` 收集。

use std::sync::{Arc, Mutex};
use tracing::warn;

/// 所有警告的统一前缀
pub const WARNING_PREFIX: &str = "slack-test-reporter";

/// 警告输出渠道
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// 转发到 `tracing::warn!`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn warn(&self, message: &str) {
        warn!("{}: {}", WARNING_PREFIX, message);
    }
}

/// 在内存中记录警告（用于测试断言）
#[derive(Debug, Default, Clone)]
pub struct RecordingWarnings {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的警告（含前缀）
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否有包含指定片段的警告
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl WarningSink for RecordingWarnings {
    fn warn(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(format!("{}: {}", WARNING_PREFIX, message));
        }
    }
}
