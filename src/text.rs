//! 消息文本解析
//!
//! 每种消息可以是静态模板（支持 `{testName}` 等占位符），也可以是一个根据数据生成文本的函数。

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::events::{AggregatedResult, ProgressSnapshot, TestCaseResult};

/// 模板数据提供的占位符（不含花括号的名称 → 值）
pub trait Placeholders {
    fn placeholders(&self) -> Vec<(&'static str, String)>;
}

impl Placeholders for () {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

impl Placeholders for TestCaseResult {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("testName", self.full_name.clone()),
            ("duration", self.duration.to_string()),
        ]
    }
}

impl Placeholders for ProgressSnapshot {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("progress", self.progress.to_string()),
            ("passed", self.passed.to_string()),
            ("failed", self.failed.to_string()),
            ("total", self.total.to_string()),
        ]
    }
}

impl Placeholders for AggregatedResult {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("numFailedTests", self.num_failed_tests.to_string()),
            ("numPassedTests", self.num_passed_tests.to_string()),
            ("numTotalTests", self.num_total_tests.to_string()),
        ]
    }
}

/// 将 `{name}` 按字面替换为对应值，未知占位符保持原样
///
/// 只扫描一遍模板，替换进来的值不会被再次展开。
pub fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        text.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];
        let matched = values.iter().find(|(name, _)| {
            candidate
                .strip_prefix(*name)
                .map_or(false, |after| after.starts_with('}'))
        });
        match matched {
            Some((name, value)) => {
                text.push_str(value);
                rest = &candidate[name.len() + 1..];
            }
            None => {
                text.push('{');
                rest = candidate;
            }
        }
    }
    text.push_str(rest);
    text
}

type TextFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// 静态模板或动态生成的消息文本
pub enum MessageText<T> {
    Literal(String),
    Computed(TextFn<T>),
}

impl<T> MessageText<T> {
    pub fn literal(text: impl Into<String>) -> Self {
        MessageText::Literal(text.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        MessageText::Computed(Arc::new(f))
    }
}

impl<T: Placeholders> MessageText<T> {
    /// 生成最终文本；函数的返回值原样使用，不再做占位符替换
    pub fn resolve(&self, data: &T) -> String {
        match self {
            MessageText::Literal(template) => substitute(template, &data.placeholders()),
            MessageText::Computed(f) => f(data),
        }
    }
}

impl<T> Clone for MessageText<T> {
    fn clone(&self) -> Self {
        match self {
            MessageText::Literal(s) => MessageText::Literal(s.clone()),
            MessageText::Computed(f) => MessageText::Computed(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for MessageText<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageText::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            MessageText::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl<T> From<&str> for MessageText<T> {
    fn from(s: &str) -> Self {
        MessageText::Literal(s.to_string())
    }
}

impl<T> From<String> for MessageText<T> {
    fn from(s: String) -> Self {
        MessageText::Literal(s)
    }
}

impl<'de, T> Deserialize<'de> for MessageText<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MessageText::Literal)
    }
}

pub const DEFAULT_RUN_START: &str = "Tests started";
pub const DEFAULT_RUN_COMPLETE_PASSED: &str = "Tests passed";
pub const DEFAULT_RUN_COMPLETE_FAILED: &str = "Tests failed";
pub const DEFAULT_RUN_PROGRESS: &str = "Tests running {progress}%";
pub const DEFAULT_TEST_CASE_PASSED: &str = "{testName} - passed in {duration}ms";
pub const DEFAULT_TEST_CASE_FAILED: &str = "{testName} - failed in {duration}ms";

/// 所有消息类型的文本配置
#[derive(Debug, Clone)]
pub struct Texts {
    pub run_start: MessageText<()>,
    pub run_complete_passed: MessageText<AggregatedResult>,
    pub run_complete_failed: MessageText<AggregatedResult>,
    pub run_progress: MessageText<ProgressSnapshot>,
    pub test_case_result_passed: MessageText<TestCaseResult>,
    pub test_case_result_failed: MessageText<TestCaseResult>,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            run_start: DEFAULT_RUN_START.into(),
            run_complete_passed: DEFAULT_RUN_COMPLETE_PASSED.into(),
            run_complete_failed: DEFAULT_RUN_COMPLETE_FAILED.into(),
            run_progress: DEFAULT_RUN_PROGRESS.into(),
            test_case_result_passed: DEFAULT_TEST_CASE_PASSED.into(),
            test_case_result_failed: DEFAULT_TEST_CASE_FAILED.into(),
        }
    }
}

impl Texts {
    /// 应用配置文件中的部分覆盖，未指定的类型保留默认值
    pub fn with_overrides(mut self, overrides: &TextOverrides) -> Self {
        if let Some(t) = &overrides.run_start {
            self.run_start = t.clone();
        }
        if let Some(t) = &overrides.run_complete_passed {
            self.run_complete_passed = t.clone();
        }
        if let Some(t) = &overrides.run_complete_failed {
            self.run_complete_failed = t.clone();
        }
        if let Some(t) = &overrides.run_progress {
            self.run_progress = t.clone();
        }
        if let Some(t) = &overrides.test_case_result_passed {
            self.test_case_result_passed = t.clone();
        }
        if let Some(t) = &overrides.test_case_result_failed {
            self.test_case_result_failed = t.clone();
        }
        self
    }

    /// 测试用例结果对应的模板
    pub fn for_test_case(&self, result: &TestCaseResult) -> &MessageText<TestCaseResult> {
        if result.status.is_passed() {
            &self.test_case_result_passed
        } else {
            &self.test_case_result_failed
        }
    }

    /// 运行结束对应的模板
    pub fn for_run_complete(&self, results: &AggregatedResult) -> &MessageText<AggregatedResult> {
        if results.has_failures() {
            &self.run_complete_failed
        } else {
            &self.run_complete_passed
        }
    }
}

/// 配置文件里 `texts` 字段（只支持字符串）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverrides {
    pub run_start: Option<MessageText<()>>,
    pub run_complete_passed: Option<MessageText<AggregatedResult>>,
    pub run_complete_failed: Option<MessageText<AggregatedResult>>,
    pub run_progress: Option<MessageText<ProgressSnapshot>>,
    pub test_case_result_passed: Option<MessageText<TestCaseResult>>,
    pub test_case_result_failed: Option<MessageText<TestCaseResult>>,
    /// 未识别的键，加载时给出提示
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TestStatus;

    #[test]
    fn test_literal_substitutes_test_case_placeholders() {
        let text: MessageText<TestCaseResult> = "{testName} - passed in {duration}ms".into();
        let result = TestCaseResult::new("suite > case", TestStatus::Passed, 42);
        assert_eq!(text.resolve(&result), "suite > case - passed in 42ms");
    }

    #[test]
    fn test_unknown_placeholders_left_untouched() {
        let text: MessageText<TestCaseResult> = "{testName} took {duration}ms ({progress}%)".into();
        let result = TestCaseResult::new("a", TestStatus::Failed, 7);
        assert_eq!(text.resolve(&result), "a took 7ms ({progress}%)");

        let start: MessageText<()> = "Started {testName}".into();
        assert_eq!(start.resolve(&()), "Started {testName}");
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let text: MessageText<ProgressSnapshot> = "{progress}% / {progress}%".into();
        let snapshot = ProgressSnapshot {
            passed: 1,
            failed: 0,
            total: 2,
            progress: 50,
        };
        assert_eq!(text.resolve(&snapshot), "50% / 50%");
    }

    #[test]
    fn test_substitution_is_literal() {
        // 值中的占位符与正则元字符都不会被再次解释
        let text: MessageText<TestCaseResult> = "[{testName}] {duration}".into();
        let result = TestCaseResult::new("{duration} $1 .*", TestStatus::Passed, 3);
        assert_eq!(text.resolve(&result), "[{duration} $1 .*] 3");
    }

    #[test]
    fn test_computed_text_used_verbatim() {
        let text = MessageText::computed(|r: &TestCaseResult| format!("{{testName}} {}", r.duration));
        let result = TestCaseResult::new("a", TestStatus::Passed, 5);
        assert_eq!(text.resolve(&result), "{testName} 5");
    }

    #[test]
    fn test_default_texts() {
        let texts = Texts::default();
        assert_eq!(texts.run_start.resolve(&()), "Tests started");

        let snapshot = ProgressSnapshot {
            passed: 3,
            failed: 2,
            total: 10,
            progress: 50,
        };
        assert_eq!(texts.run_progress.resolve(&snapshot), "Tests running 50%");

        let failed = TestCaseResult::new("B", TestStatus::Failed, 12);
        assert_eq!(texts.for_test_case(&failed).resolve(&failed), "B - failed in 12ms");

        let results = AggregatedResult {
            num_failed_tests: 1,
            ..Default::default()
        };
        assert_eq!(texts.for_run_complete(&results).resolve(&results), "Tests failed");
        let clean = AggregatedResult::default();
        assert_eq!(texts.for_run_complete(&clean).resolve(&clean), "Tests passed");
    }

    #[test]
    fn test_non_passed_status_uses_failed_template() {
        let texts = Texts::default();
        let skipped = TestCaseResult::new("C", TestStatus::Skipped, 0);
        assert_eq!(texts.for_test_case(&skipped).resolve(&skipped), "C - failed in 0ms");
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides: TextOverrides = serde_json::from_str(
            r#"{"runStart":"@here Run started","runCompleteFailed":"{numFailedTests} failed"}"#,
        )
        .unwrap();
        assert!(overrides.unknown.is_empty());
        let texts = Texts::default().with_overrides(&overrides);

        assert_eq!(texts.run_start.resolve(&()), "@here Run started");
        let results = AggregatedResult {
            num_failed_tests: 3,
            num_passed_tests: 1,
            num_total_tests: 4,
        };
        assert_eq!(texts.run_complete_failed.resolve(&results), "3 failed");
        assert_eq!(texts.run_complete_passed.resolve(&results), "Tests passed");
    }

    #[test]
    fn test_overrides_collect_unknown_keys() {
        let overrides: TextOverrides =
            serde_json::from_str(r#"{"runStrat":"typo"}"#).unwrap();
        assert!(overrides.run_start.is_none());
        assert!(overrides.unknown.contains_key("runStrat"));
    }
}
