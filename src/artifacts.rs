//! 截图匹配：按测试名在目录中查找截图并读取内容

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::warnings::WarningSink;

/// 默认截图文件名模式
pub const DEFAULT_SCREENSHOTS_PATTERN: &str = r"^{testName}\.jpg$";

/// 默认截图目录
pub const DEFAULT_SCREENSHOTS_PATH: &str = "./";

/// 待上传的截图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 截图相关配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotOptions {
    /// 是否在测试用例回复后上传截图
    pub attach: bool,
    /// 只为失败的测试用例上传
    pub only_on_fail: bool,
    /// 文件名正则模板，`{testName}` 按字面替换为测试名
    pub pattern: String,
    /// 截图目录
    pub path: PathBuf,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            attach: false,
            only_on_fail: true,
            pattern: DEFAULT_SCREENSHOTS_PATTERN.to_string(),
            path: PathBuf::from(DEFAULT_SCREENSHOTS_PATH),
        }
    }
}

impl ScreenshotOptions {
    /// 用测试名实例化文件名模式；锚点由模式自身决定
    pub fn matcher_for(&self, test_name: &str) -> Result<Regex> {
        let pattern = self.pattern.replace("{testName}", test_name);
        Regex::new(&pattern)
            .with_context(|| format!("invalid screenshots pattern for {}: {}", test_name, pattern))
    }
}

/// 截图所在的文件系统
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// 列出目录下的文件名
    async fn list_dir(&self, dir: &Path) -> Result<Vec<String>>;

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// 本地文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactStore;

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to list {}", dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

/// 根据测试名查找截图
pub struct ArtifactMatcher {
    store: Arc<dyn ArtifactStore>,
    options: ScreenshotOptions,
    warnings: Arc<dyn WarningSink>,
}

impl ArtifactMatcher {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        options: ScreenshotOptions,
        warnings: Arc<dyn WarningSink>,
    ) -> Self {
        Self {
            store,
            options,
            warnings,
        }
    }

    pub fn options(&self) -> &ScreenshotOptions {
        &self.options
    }

    /// 查找并读取测试用例的截图
    ///
    /// 读取并发进行；单个文件读取失败只记录警告并从结果中排除。
    /// 目录无法列出或模式不是合法正则时返回错误。
    pub async fn find_artifacts(&self, test_name: &str) -> Result<Vec<Artifact>> {
        if !self.options.attach {
            return Ok(Vec::new());
        }

        let files = self.store.list_dir(&self.options.path).await?;
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let matcher = self.options.matcher_for(test_name)?;
        let matching: Vec<String> = files.into_iter().filter(|f| matcher.is_match(f)).collect();
        if matching.is_empty() {
            debug!(test_name, "No screenshots matched");
            return Ok(Vec::new());
        }

        let reads = matching.into_iter().map(|filename| async move {
            let path = self.options.path.join(&filename);
            let bytes = self.store.read_file(&path).await;
            (filename, bytes)
        });

        let mut artifacts = Vec::new();
        for (filename, bytes) in join_all(reads).await {
            match bytes {
                Ok(bytes) => artifacts.push(Artifact { filename, bytes }),
                Err(e) => self
                    .warnings
                    .warn(&format!("failed to read screenshot {}: {:#}", filename, e)),
            }
        }

        debug!(test_name, count = artifacts.len(), "Screenshots matched");
        Ok(artifacts)
    }
}
