//! Slack Test Reporter CLI
//!
//! 将测试运行器输出的生命周期事件同步到 Slack 线程

use anyhow::Result;
use clap::{Parser, Subcommand};
use slack_test_reporter::cli::{handle_config, handle_replay, ConfigArgs, ReplayArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "slack-reporter")]
#[command(about = "Slack Test Reporter - 将测试运行同步到 Slack 线程")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 读取 JSON Lines 生命周期事件并发送到 Slack
    Replay(ReplayArgs),
    /// 显示解析后的配置
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 控制日志级别，例如: RUST_LOG=debug slack-reporter replay
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_test_reporter=info,slack_reporter=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => handle_replay(args).await?,
        Commands::Config(args) => handle_config(args)?,
    }

    Ok(())
}
