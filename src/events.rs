//! 测试运行器生命周期事件及其载荷
//!
//! 字段命名与运行器输出的 JSON 保持一致（camelCase），便于直接反序列化。

use serde::{Deserialize, Serialize};

/// 单个测试用例的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
    Todo,
    Disabled,
    /// 运行器给出的其它状态
    #[serde(other)]
    Other,
}

impl TestStatus {
    pub fn is_passed(self) -> bool {
        self == TestStatus::Passed
    }
}

/// 单个测试用例的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    /// 完整名称（含所属 describe 链）
    pub full_name: String,
    pub status: TestStatus,
    /// 耗时（毫秒）
    #[serde(default)]
    pub duration: u64,
}

impl TestCaseResult {
    pub fn new(full_name: impl Into<String>, status: TestStatus, duration: u64) -> Self {
        Self {
            full_name: full_name.into(),
            status,
            duration,
        }
    }
}

/// 某个测试文件完成后的累计进度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteProgress {
    #[serde(default)]
    pub num_passed_test_suites: u64,
    #[serde(default)]
    pub num_failed_test_suites: u64,
    #[serde(default)]
    pub num_total_test_suites: u64,
}

/// 整个运行结束时的汇总结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    #[serde(default)]
    pub num_failed_tests: u64,
    #[serde(default)]
    pub num_passed_tests: u64,
    #[serde(default)]
    pub num_total_tests: u64,
}

impl AggregatedResult {
    pub fn has_failures(&self) -> bool {
        self.num_failed_tests > 0
    }
}

/// 进度模板可用的数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    /// 百分比 0..=100
    pub progress: u8,
}

impl ProgressSnapshot {
    /// 由累计进度计算百分比；`total == 0` 时无法计算，返回 None
    pub fn from_suites(sample: &SuiteProgress) -> Option<Self> {
        let passed = sample.num_passed_test_suites;
        let failed = sample.num_failed_test_suites;
        let total = sample.num_total_test_suites;
        let progress = compute_progress(passed, failed, total)?;
        Some(Self {
            passed,
            failed,
            total,
            progress,
        })
    }
}

/// round((passed + failed) / total * 100)，四舍五入，超出 total 时封顶 100
pub fn compute_progress(passed: u64, failed: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let done = passed.saturating_add(failed).min(total);
    let percent = (done * 100 + total / 2) / total;
    Some(percent.min(100) as u8)
}

/// 运行器推送的生命周期事件（JSON Lines 每行一个）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LifecycleEvent {
    RunStart,
    TestCaseResult(TestCaseResult),
    TestResult(SuiteProgress),
    RunComplete(AggregatedResult),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::RunStart => "runStart",
            LifecycleEvent::TestCaseResult(_) => "testCaseResult",
            LifecycleEvent::TestResult(_) => "testResult",
            LifecycleEvent::RunComplete(_) => "runComplete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_progress_examples() {
        assert_eq!(compute_progress(0, 0, 10), Some(0));
        assert_eq!(compute_progress(5, 5, 10), Some(100));
        assert_eq!(compute_progress(3, 2, 10), Some(50));
        assert_eq!(compute_progress(1, 0, 3), Some(33));
        assert_eq!(compute_progress(2, 0, 3), Some(67));
        assert_eq!(compute_progress(1, 0, 8), Some(13)); // 12.5 向上取整
    }

    #[test]
    fn test_compute_progress_zero_total() {
        assert_eq!(compute_progress(0, 0, 0), None);
        assert_eq!(compute_progress(3, 1, 0), None);
    }

    #[test]
    fn test_compute_progress_bounded_and_monotonic() {
        for total in 1..=40u64 {
            let mut last = 0u8;
            for done in 0..=total {
                let p = compute_progress(done, 0, total).unwrap();
                assert!(p <= 100);
                assert!(p >= last, "progress went backwards at {}/{}", done, total);
                last = p;
            }
            assert_eq!(last, 100);
        }
        // 运行器计数异常时封顶
        assert_eq!(compute_progress(9, 9, 10), Some(100));
    }

    #[test]
    fn test_test_case_result_from_runner_json() {
        let json = r#"{"fullName":"suite > case","status":"passed","duration":42,"title":"case"}"#;
        let result: TestCaseResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.full_name, "suite > case");
        assert!(result.status.is_passed());
        assert_eq!(result.duration, 42);

        let other: TestCaseResult =
            serde_json::from_str(r#"{"fullName":"x","status":"focused"}"#).unwrap();
        assert_eq!(other.status, TestStatus::Other);
        assert_eq!(other.duration, 0);
    }

    #[test]
    fn test_lifecycle_event_tagging() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"event":"testResult","numPassedTestSuites":1,"numFailedTestSuites":0,"numTotalTestSuites":4}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            LifecycleEvent::TestResult(SuiteProgress {
                num_passed_test_suites: 1,
                num_failed_test_suites: 0,
                num_total_test_suites: 4,
            })
        );
        assert_eq!(event.name(), "testResult");

        let start: LifecycleEvent = serde_json::from_str(r#"{"event":"runStart"}"#).unwrap();
        assert_eq!(start, LifecycleEvent::RunStart);
    }
}
