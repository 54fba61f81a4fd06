//! X/Twitter post plugin
//!
//! Drafts posts and publishes them through the post-creator tool server.
//! Publishing is gated on an explicit `confirm` flag: an unconfirmed
//! publish never leaves the process.

use super::client::{HttpToolClient, ToolClient};
use super::protocol::{
    DraftRequest, ParameterDef, PostStyle, PublishRequest, PublishResult, ToolDefinition,
    ToolInvocation, ToolOutput, CREATE_POST, GET_LAST_DRAFT, PUBLISH_POST,
};
use super::{AgentPlugin, PluginContext};
use crate::config::{Config, DraftingConfig, ToolServerConfig};
use crate::error::PluginError;
use crate::logging::{AuditEvent, AuditLogger};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Rules an agent runtime should give its model when loading this plugin
pub const AGENT_INSTRUCTIONS: [&str; 7] = [
    "You are a social media manager for X/Twitter.",
    "Use the create_post tool first to draft a post.",
    "Always show the draft to the user before publishing.",
    "Never call publish_post with confirm=true unless the user explicitly confirms.",
    "When publishing, set confirm=true and remind the user it will post to X.",
    "Pass the exact approved text as post_text; do not invent or paraphrase the draft.",
    "If the draft text is missing, call get_last_draft; if that is empty, ask the user to paste it again.",
];

/// Draft block in free-text tool output
static POST_TEXT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)POST TEXT:\s*\n-+\n(.+?)\n-+\n").unwrap());

/// Plugin that creates and publishes X/Twitter posts
pub struct XPostPlugin {
    server: ToolServerConfig,
    drafting: DraftingConfig,
    agent_name: Option<String>,
    client: OnceCell<Arc<dyn ToolClient>>,
    client_injected: bool,
    last_draft: Mutex<Option<String>>,
    audit: Mutex<AuditLogger>,
}

impl XPostPlugin {
    /// Create a plugin from configuration. The HTTP client is built lazily.
    pub fn new(config: &Config) -> Self {
        Self {
            server: config.tool_server.clone(),
            drafting: config.drafting.clone(),
            agent_name: None,
            client: OnceCell::new(),
            client_injected: false,
            last_draft: Mutex::new(None),
            audit: Mutex::new(AuditLogger::new(config.audit.clone())),
        }
    }

    /// Create a plugin that sends tool calls through `client`.
    ///
    /// The client is kept across `on_start`; only the target and agent name
    /// are taken from the context.
    pub fn with_client(config: &Config, client: Arc<dyn ToolClient>) -> Self {
        let mut plugin = Self::new(config);
        let _ = plugin.client.set(client);
        plugin.client_injected = true;
        plugin
    }

    /// Replace the audit logger
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Mutex::new(audit);
        self
    }

    /// Tool server this plugin targets
    pub fn tool_server(&self) -> &ToolServerConfig {
        &self.server
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.agent_name.as_deref()
    }

    fn client(&self) -> Result<&Arc<dyn ToolClient>, PluginError> {
        self.client
            .get_or_try_init(|| -> Result<Arc<dyn ToolClient>, PluginError> {
                let client = HttpToolClient::new(&self.server)
                    .map_err(|e| PluginError::Client(e.to_string()))?;
                info!("Tool client initialized for {}", client.endpoint());
                Ok(Arc::new(client) as Arc<dyn ToolClient>)
            })
    }

    fn audit(&self) -> MutexGuard<'_, AuditLogger> {
        self.audit.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A draft request carrying the configured defaults
    pub fn draft_request(&self, text: impl Into<String>) -> DraftRequest {
        DraftRequest::new(text)
            .style(self.drafting.default_style.as_str())
            .include_hashtags(self.drafting.include_hashtags)
            .max_length(self.drafting.max_length)
    }

    /// Ask the tool server for a draft. Returns its response unchanged.
    pub async fn create_post(&self, request: DraftRequest) -> Result<ToolOutput, PluginError> {
        if request.text.is_empty() {
            return Err(PluginError::MissingText);
        }
        if request.max_length == 0 {
            return Err(PluginError::InvalidArguments {
                tool: CREATE_POST.to_string(),
                message: "'max_length' must be a positive integer".to_string(),
            });
        }

        info!(
            "Drafting post ({} chars, style {})",
            request.text.chars().count(),
            request.style
        );
        let output = self
            .client()?
            .call(CREATE_POST, request.to_arguments())
            .await?;

        if let Some(draft) = extract_draft_text(&output) {
            debug!("Caching draft ({} chars)", draft.chars().count());
            *self.last_draft.lock().unwrap_or_else(|e| e.into_inner()) = Some(draft);
        }

        self.audit().record(
            AuditEvent::Draft,
            None,
            &request.text,
            Some(&Value::Object(output.clone())),
            None,
        );
        Ok(output)
    }

    /// Publish `post_text`.
    ///
    /// The caller must pass the exact text the end user saw and approved;
    /// it is forwarded byte-for-byte. An empty `post_text` falls back to the
    /// cached draft. With `confirm == false` nothing is sent and the result
    /// asks for confirmation.
    pub async fn publish_post(
        &self,
        post_text: &str,
        confirm: bool,
    ) -> Result<PublishResult, PluginError> {
        self.publish(post_text, confirm, None).await
    }

    async fn publish(
        &self,
        post_text: &str,
        confirm: bool,
        invocation_id: Option<&str>,
    ) -> Result<PublishResult, PluginError> {
        let text = if post_text.is_empty() {
            match self.cached_draft() {
                Some(draft) => {
                    info!("No post_text given, using cached draft");
                    draft
                }
                None => return Err(PluginError::MissingPostText),
            }
        } else {
            post_text.to_string()
        };

        info!(
            "publish_post called ({} chars, confirm: {})",
            text.chars().count(),
            confirm
        );

        if !confirm {
            self.audit()
                .record(AuditEvent::PublishUnconfirmed, invocation_id, &text, None, None);
            return Ok(PublishResult::confirmation_required(&text));
        }

        let request = PublishRequest {
            post_text: text,
            confirm: true,
        };
        let result = self
            .client()?
            .call(PUBLISH_POST, request.to_arguments())
            .await;

        match result {
            Ok(output) => {
                info!("Post submitted to tool server");
                self.audit().record(
                    AuditEvent::Publish,
                    invocation_id,
                    &request.post_text,
                    Some(&Value::Object(output.clone())),
                    None,
                );
                Ok(PublishResult::Submitted(output))
            }
            Err(e) if e.is_indeterminate() => {
                error!("Publish outcome unknown: {}", e);
                self.audit().record(
                    AuditEvent::PublishUnknown,
                    invocation_id,
                    &request.post_text,
                    None,
                    Some(&e.to_string()),
                );
                Err(PluginError::PublishOutcomeUnknown(e))
            }
            Err(e) => {
                warn!("Publish rejected: {}", e);
                self.audit().record(
                    AuditEvent::PublishFailed,
                    invocation_id,
                    &request.post_text,
                    None,
                    Some(&e.to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Most recent draft text, or an empty string
    pub fn get_last_draft(&self) -> String {
        self.cached_draft().unwrap_or_default()
    }

    fn cached_draft(&self) -> Option<String> {
        self.last_draft
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn invoke_create(&self, invocation: &ToolInvocation) -> Result<Value, PluginError> {
        let invalid = |message: String| PluginError::InvalidArguments {
            tool: CREATE_POST.to_string(),
            message,
        };

        // `post_text` is accepted as an alias for `text`
        let text = match invocation.get_string("text").map_err(invalid)? {
            Some(text) if !text.is_empty() => text,
            _ => invocation
                .get_string("post_text")
                .map_err(invalid)?
                .unwrap_or_default(),
        };

        let mut request = self.draft_request(text);
        if let Some(style) = invocation.get_string("style").map_err(invalid)? {
            request = request.style(style);
        }
        request.include_hashtags = invocation
            .get_bool("include_hashtags", self.drafting.include_hashtags)
            .map_err(invalid)?;
        if let Some(max_length) = invocation.get_i64("max_length").map_err(invalid)? {
            request.max_length = u32::try_from(max_length)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    invalid(format!(
                        "'max_length' must be a positive integer, got {}",
                        max_length
                    ))
                })?;
        }

        self.create_post(request).await.map(Value::Object)
    }

    async fn invoke_publish(&self, invocation: &ToolInvocation) -> Result<Value, PluginError> {
        let invalid = |message: String| PluginError::InvalidArguments {
            tool: PUBLISH_POST.to_string(),
            message,
        };

        let post_text = invocation
            .get_string("post_text")
            .map_err(invalid)?
            .unwrap_or_default();
        let confirm = invocation.get_bool("confirm", false).map_err(invalid)?;

        self.publish(post_text, confirm, Some(&invocation.id))
            .await
            .map(PublishResult::into_value)
    }
}

#[async_trait]
impl AgentPlugin for XPostPlugin {
    fn name(&self) -> &str {
        "xtwitter"
    }

    fn description(&self) -> &str {
        "Creates engaging X/Twitter posts and can publish them via MCP. \
         Always preview posts before publishing and require explicit confirmation."
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn on_start(&mut self, ctx: PluginContext) -> Result<(), PluginError> {
        if !self.client_injected {
            let client = HttpToolClient::new(&ctx.tool_server)
                .map_err(|e| PluginError::Client(e.to_string()))?;
            let cell = OnceCell::new();
            let _ = cell.set(Arc::new(client) as Arc<dyn ToolClient>);
            self.client = cell;
        }
        info!(
            "Plugin '{}' started for agent {:?}, tool server {}",
            self.name(),
            ctx.agent_name,
            ctx.tool_server.endpoint()
        );

        self.server = ctx.tool_server;
        self.agent_name = ctx.agent_name;
        Ok(())
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: CREATE_POST.to_string(),
                description: "Create an attractive X/Twitter post from input text.".to_string(),
                parameters: vec![
                    ParameterDef::new("text", "string", "Input text to transform into a post"),
                    ParameterDef::new(
                        "post_text",
                        "string",
                        "Alias for text; the content to transform into a post",
                    ),
                    ParameterDef::new("style", "string", "Writing style")
                        .with_allowed(&PostStyle::KNOWN)
                        .with_default(json!(self.drafting.default_style)),
                    ParameterDef::new("include_hashtags", "boolean", "Include relevant hashtags")
                        .with_default(json!(self.drafting.include_hashtags)),
                    ParameterDef::new(
                        "max_length",
                        "integer",
                        &format!("Max characters (default {})", self.drafting.max_length),
                    )
                    .with_default(json!(self.drafting.max_length)),
                ],
                requires_confirmation: false,
                is_destructive: false,
            },
            ToolDefinition {
                name: PUBLISH_POST.to_string(),
                description: "Publish a post to X/Twitter. Defaults to the latest cached draft \
                              if post_text is omitted. Always set confirm=true to actually publish."
                    .to_string(),
                parameters: vec![
                    ParameterDef::new(
                        "post_text",
                        "string",
                        "The full post text to publish (optional if a draft was just created)",
                    ),
                    ParameterDef::new("confirm", "boolean", "Must be true to publish (safety)")
                        .with_default(json!(false)),
                ],
                requires_confirmation: true,
                is_destructive: true,
            },
            ToolDefinition {
                name: GET_LAST_DRAFT.to_string(),
                description: "Return the most recent created draft text (empty string if none)."
                    .to_string(),
                parameters: vec![],
                requires_confirmation: false,
                is_destructive: false,
            },
        ]
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, PluginError> {
        debug!("Invocation {} for tool '{}'", invocation.id, invocation.tool);

        match invocation.tool.as_str() {
            CREATE_POST => self.invoke_create(&invocation).await,
            PUBLISH_POST => self.invoke_publish(&invocation).await,
            GET_LAST_DRAFT => Ok(Value::String(self.get_last_draft())),
            other => Err(PluginError::UnknownTool(other.to_string())),
        }
    }
}

/// Find the draft text in a `create_post` response
fn extract_draft_text(output: &ToolOutput) -> Option<String> {
    for key in ["draft", "post_text"] {
        if let Some(Value::String(text)) = output.get(key) {
            if !text.trim().is_empty() {
                return Some(text.clone());
            }
        }
    }

    output
        .values()
        .filter_map(Value::as_str)
        .find_map(|s| POST_TEXT_BLOCK.captures(s))
        .map(|caps| caps[1].trim().to_string())
}
