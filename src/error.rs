//! Error types for xpost-agent

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures of a single remote tool call
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Cannot reach tool server at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Tool server returned {status} for '{tool}': {body}")]
    Http { tool: String, status: u16, body: String },

    #[error("Tool '{tool}' reported failure: {detail}")]
    Remote {
        tool: String,
        detail: serde_json::Value,
    },

    #[error("Invalid response for '{tool}': {message}")]
    Decode { tool: String, message: String },
}

impl ToolError {
    /// True when the request may or may not have reached the tool server
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            ToolError::Transport { .. } | ToolError::Timeout { .. } | ToolError::Decode { .. }
        )
    }
}

/// Errors surfaced by the plugin façade
#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Publish outcome unknown ({0}); check the account before retrying")]
    PublishOutcomeUnknown(ToolError),

    #[error("No text provided. Pass either 'text' or 'post_text' with the content to draft.")]
    MissingText,

    #[error(
        "No post_text provided and no cached draft found. Pass the exact post text to publish."
    )]
    MissingPostText,

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to build tool client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indeterminate_kinds() {
        let transport = ToolError::Transport {
            url: "http://localhost:8002/call_tool".to_string(),
            message: "connection refused".to_string(),
        };
        let http = ToolError::Http {
            tool: "publish_post".to_string(),
            status: 500,
            body: "boom".to_string(),
        };

        assert!(transport.is_indeterminate());
        assert!(!http.is_indeterminate());
    }

    #[test]
    fn test_remote_error_keeps_detail() {
        let err = ToolError::Remote {
            tool: "publish_post".to_string(),
            detail: serde_json::json!({"message": "missing X credentials"}),
        };
        assert!(err.to_string().contains("missing X credentials"));
    }

    #[test]
    fn test_plugin_error_from_tool_error() {
        let err: PluginError = ToolError::Timeout {
            tool: "create_post".to_string(),
            secs: 30,
        }
        .into();
        assert!(matches!(err, PluginError::Tool(ToolError::Timeout { .. })));
        assert_eq!(err.to_string(), "Tool 'create_post' timed out after 30s");
    }
}
