//! Plugin protocol definitions
//!
//! Defines the tool-call envelope sent to the tool server, the request
//! shapes built by the plugin, and the tool definitions handed to the
//! agent runtime.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Decoded body of a tool-server response
pub type ToolOutput = Map<String, Value>;

/// Name of the drafting tool
pub const CREATE_POST: &str = "create_post";
/// Name of the publishing tool
pub const PUBLISH_POST: &str = "publish_post";
/// Name of the cached-draft lookup
pub const GET_LAST_DRAFT: &str = "get_last_draft";

/// Envelope POSTed to the tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: &str, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            arguments,
        }
    }
}

/// Writing style requested from the tool server.
///
/// Styles outside the known set are forwarded as-is; the server decides
/// whether to accept them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PostStyle {
    #[default]
    Professional,
    Casual,
    Witty,
    Inspirational,
    Other(String),
}

impl PostStyle {
    /// Styles advertised to the agent runtime
    pub const KNOWN: [&'static str; 4] = ["professional", "casual", "witty", "inspirational"];

    pub fn as_str(&self) -> &str {
        match self {
            PostStyle::Professional => "professional",
            PostStyle::Casual => "casual",
            PostStyle::Witty => "witty",
            PostStyle::Inspirational => "inspirational",
            PostStyle::Other(s) => s,
        }
    }
}

impl From<&str> for PostStyle {
    fn from(s: &str) -> Self {
        match s {
            "professional" => PostStyle::Professional,
            "casual" => PostStyle::Casual,
            "witty" => PostStyle::Witty,
            "inspirational" => PostStyle::Inspirational,
            other => PostStyle::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PostStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PostStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PostStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PostStyle::from(s.as_str()))
    }
}

/// Arguments of a `create_post` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub text: String,
    pub style: PostStyle,
    pub include_hashtags: bool,
    pub max_length: u32,
}

impl DraftRequest {
    /// Create a draft request with default style, hashtags on and 280 characters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: PostStyle::default(),
            include_hashtags: true,
            max_length: 280,
        }
    }

    pub fn style(mut self, style: impl Into<PostStyle>) -> Self {
        self.style = style.into();
        self
    }

    pub fn include_hashtags(mut self, include: bool) -> Self {
        self.include_hashtags = include;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn to_arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("text".to_string(), json!(self.text));
        args.insert("style".to_string(), json!(self.style.as_str()));
        args.insert("include_hashtags".to_string(), json!(self.include_hashtags));
        args.insert("max_length".to_string(), json!(self.max_length));
        args
    }
}

/// Arguments of a `publish_post` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub post_text: String,
    #[serde(default)]
    pub confirm: bool,
}

impl PublishRequest {
    pub fn to_arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("post_text".to_string(), json!(self.post_text));
        args.insert("confirm".to_string(), json!(self.confirm));
        args
    }
}

/// Outcome of `publish_post`
#[derive(Debug, Clone, PartialEq)]
pub enum PublishResult {
    /// Not sent: the caller has not confirmed. Carries the text that would be published.
    ConfirmationRequired { post_text: String, message: String },
    /// Sent to the tool server; its response, unchanged
    Submitted(ToolOutput),
}

impl PublishResult {
    pub fn confirmation_required(post_text: &str) -> Self {
        PublishResult::ConfirmationRequired {
            post_text: post_text.to_string(),
            message: "Confirmation required: show this exact text to the user and call \
                      publish_post again with confirm=true once they approve."
                .to_string(),
        }
    }

    /// Render for the agent runtime
    pub fn into_value(self) -> Value {
        match self {
            PublishResult::ConfirmationRequired { post_text, message } => json!({
                "status": "confirmation_required",
                "post_text": post_text,
                "message": message,
            }),
            PublishResult::Submitted(output) => Value::Object(output),
        }
    }
}

/// Tool definition for AI prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (e.g., "create_post")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter definitions
    pub parameters: Vec<ParameterDef>,
    /// Whether this tool requires confirmation
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Whether this tool has externally visible effects
    #[serde(default)]
    pub is_destructive: bool,
}

/// Parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name
    pub name: String,
    /// Parameter type (string, integer, boolean)
    #[serde(rename = "type")]
    pub param_type: String,
    /// Description
    pub description: String,
    /// Whether parameter is required
    #[serde(default)]
    pub required: bool,
    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Accepted values
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl ParameterDef {
    pub fn new(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            description: description.to_string(),
            required: false,
            default: None,
            allowed: vec![],
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = allowed.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl ToolDefinition {
    /// Render in the OpenAI function-calling format
    pub fn to_function_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type));
            prop.insert("description".to_string(), json!(param.description));
            if !param.allowed.is_empty() {
                prop.insert("enum".to_string(), json!(param.allowed));
            }
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(param.name.clone());
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

/// A tool invocation routed from the agent runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Invocation ID for log correlation
    pub id: String,
    /// Tool name to invoke
    pub tool: String,
    /// Parameters passed to the tool
    pub params: HashMap<String, Value>,
}

impl ToolInvocation {
    /// Create a new invocation
    pub fn new(tool: &str, params: HashMap<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool: tool.to_string(),
            params,
        }
    }

    /// Get a string parameter; present but mistyped values are an error
    pub fn get_string(&self, name: &str) -> Result<Option<&str>, String> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(format!("'{}' must be a string, got {}", name, other)),
        }
    }

    /// Get a boolean parameter with default
    pub fn get_bool(&self, name: &str, default: bool) -> Result<bool, String> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(format!("'{}' must be a boolean, got {}", name, other)),
        }
    }

    /// Get an integer parameter
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, String> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| format!("'{}' must be an integer, got {}", name, v)),
        }
    }
}
