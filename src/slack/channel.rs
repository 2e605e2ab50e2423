//! 固定频道的消息适配器
//!
//! 所有操作都绑定同一个 channel id；未配置（缺少 token 或 channel）时全部跳过。
//! 回复、编辑和上传需要线程根消息，根消息不存在时同样跳过，不视为错误。

use anyhow::Result;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::api::{PostMessage, SlackApi, UpdateMessage, UploadFile};
use crate::artifacts::Artifact;
use crate::warnings::WarningSink;

/// 一次发送的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（未配置或没有线程）
    Skipped(String),
}

/// 批量上传的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// 绑定单个频道的 Slack 适配器
pub struct ChannelAdapter {
    api: Option<Arc<dyn SlackApi>>,
    channel_id: String,
    warnings: Arc<dyn WarningSink>,
}

impl ChannelAdapter {
    pub fn new(
        api: Option<Arc<dyn SlackApi>>,
        channel_id: impl Into<String>,
        warnings: Arc<dyn WarningSink>,
    ) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
            warnings,
        }
    }

    /// 是否已配置可用的客户端
    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// 发送线程根消息，返回其 ts；未配置时返回 None
    pub async fn post_root(&self, text: &str) -> Result<Option<String>> {
        let Some(api) = &self.api else {
            return Ok(None);
        };

        let posted = api
            .post_message(PostMessage {
                channel: self.channel_id.clone(),
                text: text.to_string(),
                link_names: Some(true),
                thread_ts: None,
            })
            .await?;

        info!(channel = %self.channel_id, ts = %posted.ts, "Posted run root message");
        Ok(Some(posted.ts))
    }

    /// 在线程下回复
    pub async fn post_reply(&self, root: Option<&str>, text: &str) -> Result<SendResult> {
        let (api, root) = match self.target(root) {
            Ok(target) => target,
            Err(reason) => return Ok(SendResult::Skipped(reason)),
        };

        api.post_message(PostMessage {
            channel: self.channel_id.clone(),
            text: text.to_string(),
            link_names: None,
            thread_ts: Some(root.to_string()),
        })
        .await?;

        debug!(channel = %self.channel_id, thread_ts = %root, "Posted thread reply");
        Ok(SendResult::Sent)
    }

    /// 编辑根消息
    pub async fn update_root(&self, root: Option<&str>, text: &str) -> Result<SendResult> {
        let (api, root) = match self.target(root) {
            Ok(target) => target,
            Err(reason) => return Ok(SendResult::Skipped(reason)),
        };

        api.update_message(UpdateMessage {
            channel: self.channel_id.clone(),
            ts: root.to_string(),
            text: text.to_string(),
            link_names: Some(true),
        })
        .await?;

        debug!(channel = %self.channel_id, ts = %root, "Updated run root message");
        Ok(SendResult::Sent)
    }

    /// 并发上传测试用例的截图到线程
    ///
    /// 每个文件独立上传，失败只记录警告，不影响其它文件。
    pub async fn post_attachments(
        &self,
        root: Option<&str>,
        test_name: &str,
        artifacts: Vec<Artifact>,
    ) -> UploadSummary {
        if artifacts.is_empty() {
            return UploadSummary::default();
        }
        let (api, root) = match self.target(root) {
            Ok(target) => target,
            Err(reason) => {
                debug!(test_name, reason = %reason, "Skipping screenshot upload");
                return UploadSummary::default();
            }
        };

        let uploads = artifacts.into_iter().map(|artifact| {
            let filename = artifact.filename;
            let request = UploadFile {
                channel: self.channel_id.clone(),
                thread_ts: Some(root.to_string()),
                filename: filename.clone(),
                bytes: artifact.bytes,
            };
            async move { (filename, api.upload_file(request).await) }
        });

        let mut summary = UploadSummary::default();
        for (filename, result) in join_all(uploads).await {
            match result {
                Ok(file_id) => {
                    debug!(test_name, filename = %filename, file_id = %file_id, "Uploaded screenshot");
                    summary.uploaded += 1;
                }
                Err(e) => {
                    self.warnings
                        .warn(&format!("failed to upload screenshot {}: {:#}", filename, e));
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// 回复/编辑/上传的前置检查
    fn target<'a>(
        &'a self,
        root: Option<&'a str>,
    ) -> std::result::Result<(&'a Arc<dyn SlackApi>, &'a str), String> {
        let Some(api) = &self.api else {
            return Err("slack is not configured".to_string());
        };
        let Some(root) = root else {
            return Err("no thread root message".to_string());
        };
        Ok((api, root))
    }
}
