//! Slack Web API 客户端
//!
//! 只覆盖上报需要的三类操作：发消息（含线程回复）、编辑消息、上传文件。
//! 不做重试，失败直接返回给调用方。

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Slack Web API 默认地址
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// chat.postMessage 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    /// 解析 `@name` 提及
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_names: Option<bool>,
    /// 线程父消息 ts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// chat.update 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateMessage {
    pub channel: String,
    pub ts: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_names: Option<bool>,
}

/// files.uploadV2 请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 发送/编辑成功后的消息标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// 消息渠道能力
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, request: PostMessage) -> Result<PostedMessage>;

    async fn update_message(&self, request: UpdateMessage) -> Result<PostedMessage>;

    /// 上传文件，返回 file id
    async fn upload_file(&self, request: UploadFile) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteUploadResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 基于 reqwest 的 Slack Web API 客户端
#[derive(Debug, Clone)]
pub struct SlackWebClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl SlackWebClient {
    pub fn new(api_base: &str, bot_token: &str, timeout_ms: u64) -> Result<Self> {
        if bot_token.trim().is_empty() {
            bail!("slack bot token is required");
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms.max(1)))
            .build()
            .context("failed to create slack http client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// 以 JSON 调用一个 Web API 方法
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method, "Calling Slack Web API");
        let response = self
            .http
            .post(self.method_url(method))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("slack {} request failed", method))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("slack {} failed: status={} body={}", method, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode slack {} response", method))
    }
}

fn api_error(method: &str, error: Option<String>) -> anyhow::Error {
    anyhow!(
        "slack {} failed: {}",
        method,
        error.unwrap_or_else(|| "unknown error".to_string())
    )
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn post_message(&self, request: PostMessage) -> Result<PostedMessage> {
        let response: ChatMessageResponse = self.call("chat.postMessage", &request).await?;
        if !response.ok {
            return Err(api_error("chat.postMessage", response.error));
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or(request.channel),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    async fn update_message(&self, request: UpdateMessage) -> Result<PostedMessage> {
        let response: ChatMessageResponse = self.call("chat.update", &request).await?;
        if !response.ok {
            return Err(api_error("chat.update", response.error));
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or(request.channel),
            ts: response.ts.unwrap_or(request.ts),
        })
    }

    async fn upload_file(&self, request: UploadFile) -> Result<String> {
        if request.filename.trim().is_empty() {
            bail!("slack file upload requires a filename");
        }
        if request.bytes.is_empty() {
            bail!("slack file upload requires a non-empty payload");
        }

        let ticket: UploadUrlResponse = self
            .call(
                "files.getUploadURLExternal",
                &json!({
                    "filename": request.filename,
                    "length": request.bytes.len(),
                }),
            )
            .await?;
        if !ticket.ok {
            return Err(api_error("files.getUploadURLExternal", ticket.error));
        }
        let upload_url = ticket
            .upload_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("slack files.getUploadURLExternal missing upload_url"))?;
        let file_id = ticket
            .file_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("slack files.getUploadURLExternal missing file_id"))?;

        let uploaded = self
            .http
            .post(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(request.bytes)
            .send()
            .await
            .context("failed to send file bytes to slack upload url")?;
        if !uploaded.status().is_success() {
            bail!("slack file upload failed: status={}", uploaded.status());
        }

        let mut complete = json!({
            "files": [{ "id": file_id, "title": request.filename }],
            "channel_id": request.channel,
        });
        if let Some(thread_ts) = request.thread_ts {
            complete["thread_ts"] = serde_json::Value::String(thread_ts);
        }
        let completed: CompleteUploadResponse =
            self.call("files.completeUploadExternal", &complete).await?;
        if !completed.ok {
            return Err(api_error("files.completeUploadExternal", completed.error));
        }

        Ok(file_id)
    }
}
