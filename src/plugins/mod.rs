//! Agent plugin interface
//!
//! An agent runtime loads a plugin, starts it with its runtime context,
//! advertises the plugin's tools to the model and routes tool calls back
//! through `invoke`.

mod client;
mod protocol;
mod xpost;

pub use client::{HttpToolClient, ToolClient};
pub use protocol::{
    DraftRequest, ParameterDef, PostStyle, PublishRequest, PublishResult, ToolCall,
    ToolDefinition, ToolInvocation, ToolOutput, CREATE_POST, GET_LAST_DRAFT, PUBLISH_POST,
};
pub use xpost::{XPostPlugin, AGENT_INSTRUCTIONS};

use crate::config::ToolServerConfig;
use crate::error::PluginError;
use async_trait::async_trait;

/// Runtime context handed to a plugin when the agent starts
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    /// Where the tool server lives
    pub tool_server: ToolServerConfig,
    /// Name of the hosting agent
    pub agent_name: Option<String>,
}

/// A plugin an agent runtime can load
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// Short identifier
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    fn version(&self) -> &str;

    /// Called once when the agent starts. Must not perform network I/O.
    async fn on_start(&mut self, ctx: PluginContext) -> Result<(), PluginError>;

    /// Tools exposed to the model
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a tool call routed from the model
    async fn invoke(&self, invocation: ToolInvocation) -> Result<serde_json::Value, PluginError>;
}
