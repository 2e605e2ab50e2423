//! 一次测试运行对应的 Slack 线程状态

use std::sync::OnceLock;

/// 线程根消息的 ts，只能写入一次
///
/// 运行开始消息发送成功后写入；之后的回复和更新都挂在这条消息下。
#[derive(Debug, Default)]
pub struct ThreadRoot {
    ts: OnceLock<String>,
}

impl ThreadRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录根消息 ts；已设置过则保持原值并返回 false
    pub fn set(&self, ts: impl Into<String>) -> bool {
        self.ts.set(ts.into()).is_ok()
    }

    pub fn get(&self) -> Option<&str> {
        self.ts.get().map(String::as_str)
    }

    pub fn is_set(&self) -> bool {
        self.ts.get().is_some()
    }
}
