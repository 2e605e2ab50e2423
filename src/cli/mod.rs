//! CLI command handling

pub mod output;
pub mod replay;
pub mod show_config;

pub use output::*;
pub use replay::*;
pub use show_config::*;

use anyhow::Result;
use std::path::Path;

use crate::config::ReporterOptions;

/// 加载配置：指定路径优先，否则使用默认配置文件
pub fn load_options(path: Option<&Path>) -> Result<ReporterOptions> {
    match path {
        Some(path) => ReporterOptions::load(path),
        None => ReporterOptions::load_default(),
    }
}
