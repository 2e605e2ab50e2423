//! Slack 接入：Web API 客户端与固定频道适配器

pub mod api;
pub mod channel;

pub use api::{PostMessage, PostedMessage, SlackApi, SlackWebClient, UpdateMessage, UploadFile};
pub use channel::{ChannelAdapter, SendResult, UploadSummary};
