//! Config 命令 - 打印解析后的配置（token 脱敏）

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::load_options;
use crate::config::ReporterConfig;

/// Config 命令参数
#[derive(Args)]
pub struct ConfigArgs {
    /// 配置文件路径（默认 ~/.config/slack-test-reporter/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// 渲染配置概要
pub fn render_config(config: &ReporterConfig) -> String {
    let mut lines = vec![format!("{:#?}", config)];
    if config.is_complete() {
        lines.push("slack: enabled".to_string());
    } else {
        lines.push("slack: disabled".to_string());
        lines.extend(config.missing_warnings().into_iter().map(|w| format!("  - {}", w)));
    }
    lines.extend(config.notices.iter().map(|n| format!("  - {}", n)));
    lines.join("\n")
}

/// 处理 config 命令
pub fn handle_config(args: ConfigArgs) -> Result<()> {
    let options = load_options(args.config.as_deref())?;
    println!("{}", render_config(&options.resolve()));
    Ok(())
}
