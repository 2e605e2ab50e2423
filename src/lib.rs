//! Slack Test Reporter - 将测试运行同步为 Slack 线程
//!
//! 运行开始时发送根消息，每个测试用例在线程下回复，进度与最终结果通过编辑根消息展示。

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod events;
pub mod reporter;
pub mod session;
pub mod slack;
pub mod text;
pub mod warnings;

pub use artifacts::{Artifact, ArtifactMatcher, ArtifactStore, FsArtifactStore, ScreenshotOptions};
pub use config::{ReporterConfig, ReporterOptions};
pub use events::{
    compute_progress, AggregatedResult, LifecycleEvent, ProgressSnapshot, SuiteProgress,
    TestCaseResult, TestStatus,
};
pub use reporter::{HookOutcome, SlackReporter, SlackReporterBuilder};
pub use session::ThreadRoot;
pub use slack::{ChannelAdapter, SendResult, SlackApi, SlackWebClient};
pub use text::{MessageText, Placeholders, Texts};
pub use warnings::{RecordingWarnings, TracingWarnings, WarningSink};
