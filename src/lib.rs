//! xpost-agent - draft and publish X/Twitter posts from an AI agent
//!
//! The plugin forwards `create_post` and `publish_post` to a post-creator
//! tool server over HTTP. Nothing is published unless the caller passes
//! `confirm = true`.

pub mod config;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod prompt;

pub use config::Config;
pub use error::{ConfigError, PluginError, ToolError};
pub use plugins::{AgentPlugin, PluginContext, PublishResult, XPostPlugin};
