//! Replay 命令 - 将运行器输出的生命周期事件转发给上报器
//!
//! 输入为 JSON Lines，每行一个事件，例如：
//! `{"event":"testCaseResult","fullName":"login works","status":"passed","duration":42}`

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{format_output, load_options};
use crate::events::LifecycleEvent;
use crate::reporter::{HookOutcome, SlackReporter};

/// Replay 命令参数
#[derive(Args)]
pub struct ReplayArgs {
    /// 事件文件（JSON Lines），默认读取 stdin
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// 配置文件路径（默认 ~/.config/slack-test-reporter/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 输出 JSON 格式的统计
    #[arg(long)]
    pub json: bool,
}

/// Replay 统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 无法解析的行
    pub malformed: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &HookOutcome) {
        self.events += 1;
        match outcome {
            HookOutcome::Delivered => self.delivered += 1,
            HookOutcome::Skipped(_) => self.skipped += 1,
            HookOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events: {} delivered, {} skipped, {} failed, {} malformed",
            self.events, self.delivered, self.skipped, self.failed, self.malformed
        )
    }
}

/// 解析一行事件；空行返回 None
pub fn parse_event_line(line: &str) -> Result<Option<LifecycleEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event = serde_json::from_str(line).context("invalid lifecycle event")?;
    Ok(Some(event))
}

/// 按顺序处理事件流，每个事件处理完再读下一行
pub async fn replay_events<R>(reporter: &SlackReporter, reader: R) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read event stream")? {
        line_no += 1;
        let event = match parse_event_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(line = line_no, error = %error, "Skipping malformed event line");
                summary.malformed += 1;
                continue;
            }
        };

        let outcome = reporter.dispatch(&event).await;
        debug!(line = line_no, event = event.name(), ?outcome, "Event handled");
        summary.record(&outcome);
    }

    Ok(summary)
}

/// 处理 replay 命令
pub async fn handle_replay(args: ReplayArgs) -> Result<()> {
    let options = load_options(args.config.as_deref())?;
    let reporter = SlackReporter::new(options.resolve());

    let summary = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            replay_events(&reporter, BufReader::new(file)).await?
        }
        None => replay_events(&reporter, BufReader::new(tokio::io::stdin())).await?,
    };

    println!("{}", format_output(&summary, args.json));
    Ok(())
}
