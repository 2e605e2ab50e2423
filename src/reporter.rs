//! Slack 测试上报器
//!
//! 接收测试运行器的四个生命周期回调，把运行过程同步成 Slack 里的一个线程：
//! - 运行开始：发送根消息，记录其 ts
//! - 测试用例结果：在线程下回复，按配置上传截图
//! - 测试文件结果：编辑根消息显示进度
//! - 运行结束：编辑根消息显示最终结果
//!
//! 每个回调都不会返回错误或 panic 给调用方，失败只记录警告。

use anyhow::Result;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifacts::{ArtifactMatcher, ArtifactStore, FsArtifactStore};
use crate::config::ReporterConfig;
use crate::events::{
    AggregatedResult, LifecycleEvent, ProgressSnapshot, SuiteProgress, TestCaseResult,
};
use crate::session::ThreadRoot;
use crate::slack::{ChannelAdapter, SendResult, SlackApi, SlackWebClient};
use crate::warnings::{TracingWarnings, WarningSink};

/// 一次回调的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// 消息已送达
    Delivered,
    /// 跳过（未配置、没有线程、无法计算进度等）
    Skipped(String),
    /// 失败（已记录警告）
    Failed(String),
}

impl HookOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, HookOutcome::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, HookOutcome::Failed(_))
    }
}

impl From<SendResult> for HookOutcome {
    fn from(result: SendResult) -> Self {
        match result {
            SendResult::Sent => HookOutcome::Delivered,
            SendResult::Skipped(reason) => HookOutcome::Skipped(reason),
        }
    }
}

/// 构建器：可替换 Slack 客户端、截图存储和警告输出
pub struct SlackReporterBuilder {
    config: ReporterConfig,
    api: Option<Arc<dyn SlackApi>>,
    store: Arc<dyn ArtifactStore>,
    warnings: Arc<dyn WarningSink>,
}

impl SlackReporterBuilder {
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            config,
            api: None,
            store: Arc::new(FsArtifactStore),
            warnings: Arc::new(TracingWarnings),
        }
    }

    /// 使用指定的 Slack 客户端（默认按配置创建 `SlackWebClient`）
    pub fn api(mut self, api: Arc<dyn SlackApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// 截图所在的存储（默认本地文件系统）
    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    /// 警告输出（默认 tracing）
    pub fn warnings(mut self, warnings: Arc<dyn WarningSink>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn build(self) -> SlackReporter {
        let Self {
            config,
            api,
            store,
            warnings,
        } = self;

        for notice in &config.notices {
            warnings.warn(notice);
        }
        for missing in config.missing_warnings() {
            warnings.warn(&missing);
        }

        let api = match (&config.bot_token, &config.channel_id) {
            (Some(token), Some(channel)) => {
                info!(channel = %channel, "Slack test reporter enabled");
                match api {
                    Some(api) => Some(api),
                    None => match SlackWebClient::new(&config.api_base, token, config.timeout_ms) {
                        Ok(client) => Some(Arc::new(client) as Arc<dyn SlackApi>),
                        Err(e) => {
                            warnings.warn(&format!("failed to create slack client: {:#}", e));
                            None
                        }
                    },
                }
            }
            _ => None,
        };

        let channel = ChannelAdapter::new(
            api,
            config.channel_id.clone().unwrap_or_default(),
            warnings.clone(),
        );
        let artifacts = ArtifactMatcher::new(store, config.screenshots.clone(), warnings.clone());

        SlackReporter {
            config,
            channel,
            artifacts,
            thread: ThreadRoot::new(),
            warnings,
        }
    }
}

/// Slack 测试上报器
pub struct SlackReporter {
    config: ReporterConfig,
    channel: ChannelAdapter,
    artifacts: ArtifactMatcher,
    thread: ThreadRoot,
    warnings: Arc<dyn WarningSink>,
}

impl SlackReporter {
    /// 使用默认的 Slack 客户端、本地文件系统和 tracing 警告
    pub fn new(config: ReporterConfig) -> Self {
        SlackReporterBuilder::new(config).build()
    }

    pub fn builder(config: ReporterConfig) -> SlackReporterBuilder {
        SlackReporterBuilder::new(config)
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// 是否可以发送消息
    pub fn is_enabled(&self) -> bool {
        self.channel.is_configured()
    }

    /// 线程根消息 ts（运行开始消息发送成功后才有）
    pub fn thread_ts(&self) -> Option<&str> {
        self.thread.get()
    }

    /// 运行开始
    pub async fn on_run_start(&self) -> HookOutcome {
        self.isolate("failed to publish run start message", self.run_start())
            .await
    }

    /// 单个测试用例完成
    pub async fn on_test_case_result(&self, result: &TestCaseResult) -> HookOutcome {
        self.isolate(
            "failed to publish run test case result",
            self.test_case_result(result),
        )
        .await
    }

    /// 单个测试文件完成（累计进度）
    pub async fn on_test_result(&self, progress: &SuiteProgress) -> HookOutcome {
        self.isolate("failed to publish run progress message", self.test_result(progress))
            .await
    }

    /// 运行结束
    pub async fn on_run_complete(&self, results: &AggregatedResult) -> HookOutcome {
        self.isolate("failed to publish run complete message", self.run_complete(results))
            .await
    }

    /// 按事件类型分发
    pub async fn dispatch(&self, event: &LifecycleEvent) -> HookOutcome {
        match event {
            LifecycleEvent::RunStart => self.on_run_start().await,
            LifecycleEvent::TestCaseResult(result) => self.on_test_case_result(result).await,
            LifecycleEvent::TestResult(progress) => self.on_test_result(progress).await,
            LifecycleEvent::RunComplete(results) => self.on_run_complete(results).await,
        }
    }

    async fn run_start(&self) -> Result<HookOutcome> {
        if self.thread.is_set() {
            return Ok(HookOutcome::Skipped("run already started".to_string()));
        }

        let text = self.config.texts.run_start.resolve(&());
        let Some(ts) = self.channel.post_root(&text).await? else {
            return Ok(HookOutcome::Skipped("slack is not configured".to_string()));
        };

        if !self.thread.set(ts) {
            debug!("Thread root already recorded by a concurrent run start");
        }
        Ok(HookOutcome::Delivered)
    }

    async fn test_case_result(&self, result: &TestCaseResult) -> Result<HookOutcome> {
        let text = self.config.texts.for_test_case(result).resolve(result);
        let outcome = self.channel.post_reply(self.thread.get(), &text).await?;

        if !self.channel.is_configured() {
            return Ok(outcome.into());
        }
        if self.config.screenshots.only_on_fail && result.status.is_passed() {
            return Ok(outcome.into());
        }

        let artifacts = self.artifacts.find_artifacts(&result.full_name).await?;
        if !artifacts.is_empty() {
            let summary = self
                .channel
                .post_attachments(self.thread.get(), &result.full_name, artifacts)
                .await;
            debug!(
                test_name = %result.full_name,
                uploaded = summary.uploaded,
                failed = summary.failed,
                "Screenshots processed"
            );
        }

        Ok(outcome.into())
    }

    async fn test_result(&self, progress: &SuiteProgress) -> Result<HookOutcome> {
        let Some(snapshot) = ProgressSnapshot::from_suites(progress) else {
            debug!("Skipping progress update: no test suites");
            return Ok(HookOutcome::Skipped("no test suites to report progress on".to_string()));
        };

        let text = self.config.texts.run_progress.resolve(&snapshot);
        Ok(self.channel.update_root(self.thread.get(), &text).await?.into())
    }

    async fn run_complete(&self, results: &AggregatedResult) -> Result<HookOutcome> {
        let text = self.config.texts.for_run_complete(results).resolve(results);
        Ok(self.channel.update_root(self.thread.get(), &text).await?.into())
    }

    /// 把错误和 panic 转成 `HookOutcome::Failed` 并记录警告
    async fn isolate<F>(&self, failure: &str, handler: F) -> HookOutcome
    where
        F: Future<Output = Result<HookOutcome>>,
    {
        let error = match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };

        self.warnings.warn(&format!("{}: {}", failure, error));
        HookOutcome::Failed(error)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TestStatus;
    use crate::slack::api::{PostMessage, PostedMessage, UpdateMessage, UploadFile};
    use crate::text::{MessageText, Texts};
    use crate::warnings::RecordingWarnings;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 只计数的 Slack 客户端
    #[derive(Default)]
    struct CountingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SlackApi for CountingApi {
        async fn post_message(&self, request: PostMessage) -> Result<PostedMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PostedMessage {
                channel: request.channel,
                ts: "1000".to_string(),
            })
        }

        async fn update_message(&self, request: UpdateMessage) -> Result<PostedMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PostedMessage {
                channel: request.channel,
                ts: request.ts,
            })
        }

        async fn upload_file(&self, _request: UploadFile) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("F1".to_string())
        }
    }

    fn reporter_with(config: ReporterConfig) -> (SlackReporter, Arc<CountingApi>, RecordingWarnings) {
        let api = Arc::new(CountingApi::default());
        let warnings = RecordingWarnings::new();
        let reporter = SlackReporter::builder(config)
            .api(api.clone())
            .warnings(Arc::new(warnings.clone()))
            .build();
        (reporter, api, warnings)
    }

    #[test]
    fn test_hook_outcome_from_send_result() {
        assert_eq!(HookOutcome::from(SendResult::Sent), HookOutcome::Delivered);
        assert_eq!(
            HookOutcome::from(SendResult::Skipped("x".to_string())),
            HookOutcome::Skipped("x".to_string())
        );
    }

    #[test]
    fn test_missing_config_warns_once_per_field() {
        let config = ReporterConfig::new("", "");
        let (reporter, _, warnings) = reporter_with(config);

        assert!(!reporter.is_enabled());
        assert_eq!(warnings.len(), 2);
        assert!(warnings.contains("bot token is missing"));
        assert!(warnings.contains("channel ID is missing"));
    }

    #[tokio::test]
    async fn test_second_run_start_keeps_thread() {
        let (reporter, api, _) = reporter_with(ReporterConfig::new("xoxb-1", "C1"));

        assert_eq!(reporter.on_run_start().await, HookOutcome::Delivered);
        let second = reporter.on_run_start().await;

        assert!(matches!(second, HookOutcome::Skipped(_)));
        assert_eq!(reporter.thread_ts(), Some("1000"));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_text_function_is_isolated() {
        let texts = Texts {
            run_start: MessageText::computed(|_: &()| panic!("template exploded")),
            ..Texts::default()
        };
        let config = ReporterConfig::new("xoxb-1", "C1").with_texts(texts);
        let (reporter, api, warnings) = reporter_with(config);

        let outcome = reporter.on_run_start().await;

        assert!(outcome.is_failed());
        assert!(warnings.contains("failed to publish run start message: handler panicked: template exploded"));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.thread_ts(), None);
    }

    #[tokio::test]
    async fn test_zero_total_progress_is_skipped() {
        let (reporter, api, warnings) = reporter_with(ReporterConfig::new("xoxb-1", "C1"));
        reporter.on_run_start().await;

        let outcome = reporter.on_test_result(&SuiteProgress::default()).await;

        assert!(matches!(outcome, HookOutcome::Skipped(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let (reporter, api, _) = reporter_with(ReporterConfig::new("xoxb-1", "C1"));

        let events = vec![
            LifecycleEvent::RunStart,
            LifecycleEvent::TestCaseResult(TestCaseResult::new("A", TestStatus::Passed, 1)),
            LifecycleEvent::RunComplete(AggregatedResult::default()),
        ];
        for event in &events {
            assert_eq!(reporter.dispatch(event).await, HookOutcome::Delivered);
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }
}
