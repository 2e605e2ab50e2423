//! 上报配置
//!
//! 配置读取优先级（token 与 channel 各自独立）：
//! 1. 显式配置项 `slackBotToken` / `slackChannelId`
//! 2. 配置项指定名称的环境变量（默认 `SLACK_BOT_TOKEN` / `SLACK_CHANNEL_ID`）
//!
//! 配置文件默认位于 `~/.config/slack-test-reporter/config.json`。

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::{ScreenshotOptions, DEFAULT_SCREENSHOTS_PATH, DEFAULT_SCREENSHOTS_PATTERN};
use crate::slack::api::{DEFAULT_TIMEOUT_MS, SLACK_API_BASE};
use crate::text::{TextOverrides, Texts};

/// 默认 token 环境变量
pub const DEFAULT_BOT_TOKEN_ENV_VAR: &str = "SLACK_BOT_TOKEN";

/// 默认 channel 环境变量
pub const DEFAULT_CHANNEL_ID_ENV_VAR: &str = "SLACK_CHANNEL_ID";

/// 用户提供的配置项（JSON，camelCase）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReporterOptions {
    pub slack_bot_token: Option<String>,
    pub slack_channel_id: Option<String>,
    pub slack_bot_token_env_var: String,
    pub slack_channel_id_env_var: String,
    pub texts: TextOverrides,
    pub attach_screenshots: bool,
    pub attach_screenshots_only_on_fail: bool,
    pub screenshots_pattern: String,
    pub screenshots_path: PathBuf,
    /// Slack Web API 地址（代理或测试时使用）
    pub slack_api_base: String,
    /// 请求超时（毫秒）
    pub request_timeout_ms: u64,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            slack_bot_token: None,
            slack_channel_id: None,
            slack_bot_token_env_var: DEFAULT_BOT_TOKEN_ENV_VAR.to_string(),
            slack_channel_id_env_var: DEFAULT_CHANNEL_ID_ENV_VAR.to_string(),
            texts: TextOverrides::default(),
            attach_screenshots: false,
            attach_screenshots_only_on_fail: true,
            screenshots_pattern: DEFAULT_SCREENSHOTS_PATTERN.to_string(),
            screenshots_path: PathBuf::from(DEFAULT_SCREENSHOTS_PATH),
            slack_api_base: SLACK_API_BASE.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ReporterOptions {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/slack-test-reporter/config.json"))
    }

    /// 加载默认配置文件，不存在时使用默认值
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// 使用进程环境变量解析
    pub fn resolve(&self) -> ReporterConfig {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// 解析为最终配置；`env` 用于查询环境变量
    pub fn resolve_with<F>(&self, env: F) -> ReporterConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: &Option<String>, var: &str| {
            non_blank(explicit.clone()).or_else(|| non_blank(env(var)))
        };

        let mut notices = Vec::new();
        if !self.texts.unknown.is_empty() {
            let mut keys: Vec<&str> = self.texts.unknown.keys().map(String::as_str).collect();
            keys.sort();
            notices.push(format!("ignoring unknown texts keys: {}", keys.join(", ")));
        }

        ReporterConfig {
            bot_token: pick(&self.slack_bot_token, &self.slack_bot_token_env_var),
            channel_id: pick(&self.slack_channel_id, &self.slack_channel_id_env_var),
            bot_token_env_var: self.slack_bot_token_env_var.clone(),
            channel_id_env_var: self.slack_channel_id_env_var.clone(),
            texts: Texts::default().with_overrides(&self.texts),
            screenshots: ScreenshotOptions {
                attach: self.attach_screenshots,
                only_on_fail: self.attach_screenshots_only_on_fail,
                pattern: self.screenshots_pattern.clone(),
                path: self.screenshots_path.clone(),
            },
            api_base: self.slack_api_base.clone(),
            timeout_ms: self.request_timeout_ms,
            notices,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 解析后的只读配置
#[derive(Clone)]
pub struct ReporterConfig {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub bot_token_env_var: String,
    pub channel_id_env_var: String,
    pub texts: Texts,
    pub screenshots: ScreenshotOptions,
    pub api_base: String,
    pub timeout_ms: u64,
    /// 解析过程中的提示，构造 reporter 时输出
    pub notices: Vec<String>,
}

impl ReporterConfig {
    /// 直接构造（不经过环境变量）
    pub fn new(bot_token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        let mut config = ReporterOptions::default().resolve_with(|_| None);
        config.bot_token = non_blank(Some(bot_token.into()));
        config.channel_id = non_blank(Some(channel_id.into()));
        config
    }

    pub fn with_texts(mut self, texts: Texts) -> Self {
        self.texts = texts;
        self
    }

    pub fn with_screenshots(mut self, screenshots: ScreenshotOptions) -> Self {
        self.screenshots = screenshots;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// token 与 channel 均已提供
    pub fn is_complete(&self) -> bool {
        self.bot_token.is_some() && self.channel_id.is_some()
    }

    /// 缺失项的警告
    pub fn missing_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.bot_token.is_none() {
            warnings.push(format!(
                "bot token is missing, please provide bot token using the reporter options or environment variable {}",
                self.bot_token_env_var
            ));
        }
        if self.channel_id.is_none() {
            warnings.push(format!(
                "channel ID is missing, please provide channel ID using the reporter options or environment variable {}",
                self.channel_id_env_var
            ));
        }
        warnings
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("bot_token", &self.bot_token.as_deref().map(mask_token))
            .field("channel_id", &self.channel_id)
            .field("texts", &self.texts)
            .field("screenshots", &self.screenshots)
            .field("api_base", &self.api_base)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// 只保留 token 前缀
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(5).collect();
    if token.chars().count() <= 5 {
        "*****".to_string()
    } else {
        format!("{}*****", prefix)
    }
}
