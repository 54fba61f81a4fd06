//! Configuration management for xpost-agent
//!
//! Handles loading and merging configuration from multiple sources:
//! 1. Compiled defaults
//! 2. System config (/etc/xpost/config.toml)
//! 3. User config (~/.xpost/config.toml)
//! 4. Config file given on the command line
//! 5. Environment variables
//! 6. CLI arguments (applied by the caller)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tool_server: ToolServerConfig,
    pub drafting: DraftingConfig,
    pub audit: AuditConfig,
    pub logging: LogConfig,
}

/// Post-creator tool server location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServerConfig {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Path of the tool-call endpoint
    pub path: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Defaults applied to drafts when the caller does not specify them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftingConfig {
    pub default_style: String,
    pub include_hashtags: bool,
    pub max_length: u32,
}

/// Publish audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record draft and publish events
    pub enabled: bool,
    /// Log file path
    pub path: PathBuf,
    /// Redact secrets from entries
    pub redact_secrets: bool,
    /// Maximum log file size before rotation
    pub max_log_size: u64,
    /// Number of rotated logs to keep
    pub log_retention: u32,
}

/// Diagnostic logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    /// Output format: text or json
    pub format: String,
    /// Write to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8002,
            path: "/call_tool".to_string(),
            timeout: 30,
        }
    }
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            default_style: "professional".to_string(),
            include_hashtags: true,
            max_length: 280,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            enabled: true,
            path: home.join(".xpost/logs/publish.log"),
            redact_secrets: true,
            max_log_size: 10 * 1024 * 1024, // 10MB
            log_retention: 5,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

impl ToolServerConfig {
    /// Full URL of the tool-call endpoint
    pub fn endpoint(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(cli_config: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let system_config = Path::new("/etc/xpost/config.toml");
        if system_config.exists() {
            debug!("Loading system config from {:?}", system_config);
            config.merge_from_file(system_config)?;
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".xpost/config.toml");
            if user_config.exists() {
                debug!("Loading user config from {:?}", user_config);
                config.merge_from_file(&user_config)?;
            }
        }

        if let Some(path) = cli_config {
            debug!("Loading CLI config from {:?}", path);
            config.merge_from_file(path)?;
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Merge configuration from a file.
    ///
    /// Only keys present in the file override the current values.
    fn merge_from_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

        let layer: toml::Table = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        self.merge(layer)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Merge a parsed layer into this config (the layer takes precedence)
    fn merge(&mut self, layer: toml::Table) -> Result<(), String> {
        let mut base = match toml::Value::try_from(&*self) {
            Ok(toml::Value::Table(table)) => table,
            Ok(_) => return Err("config did not serialize to a table".to_string()),
            Err(e) => return Err(e.to_string()),
        };
        merge_tables(&mut base, layer);
        *self = toml::Value::Table(base)
            .try_into()
            .map_err(|e: toml::de::Error| e.to_string())?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MCP_HOST") {
            self.tool_server.host = host;
        }
        if let Some(port) = lookup("MCP_PORT") {
            self.tool_server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("MCP_PORT is not a port: {}", port)))?;
        }
        if let Some(timeout) = lookup("XPOST_TIMEOUT") {
            self.tool_server.timeout = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("XPOST_TIMEOUT is not a number: {}", timeout))
            })?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(file) = lookup("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(path) = lookup("XPOST_AUDIT_LOG") {
            self.audit.path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool_server.host.is_empty() {
            return Err(ConfigError::MissingField("tool_server.host".to_string()));
        }
        if self.tool_server.port == 0 {
            return Err(ConfigError::Invalid(
                "tool_server.port must be non-zero".to_string(),
            ));
        }
        if self.tool_server.timeout == 0 {
            return Err(ConfigError::Invalid(
                "tool_server.timeout must be at least one second".to_string(),
            ));
        }
        if self.drafting.max_length == 0 {
            return Err(ConfigError::Invalid(
                "drafting.max_length must be positive".to_string(),
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be one of: {:?}",
                valid_formats
            )));
        }

        Ok(())
    }
}

/// Overlay `layer` onto `base`, recursing into nested tables
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}

/// Language-model provider the agent runtime will use
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProvider {
    pub provider: &'static str,
    pub model: String,
    pub api_key_env: &'static str,
    pub api_key_present: bool,
}

/// Credential variables read by the tool server when publishing
pub const X_CREDENTIAL_VARS: [&str; 4] = [
    "X_API_KEY",
    "X_API_SECRET",
    "X_ACCESS_TOKEN",
    "X_ACCESS_TOKEN_SECRET",
];

/// Snapshot of the environment consumed by the runtime and the tool server.
///
/// Only variable names and presence are recorded, never values.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub model: ModelProvider,
    pub x_credentials: Vec<(String, bool)>,
}

impl EnvironmentReport {
    /// Collect from the process environment
    pub fn collect() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Collect using a custom variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).map(|v| !v.is_empty()).unwrap_or(false);

        // Mistral > xAI > OpenAI
        let model = if present("MISTRAL_API_KEY") {
            ModelProvider {
                provider: "mistral",
                model: lookup("MISTRAL_MODEL").unwrap_or_else(|| "mistral-large-2512".to_string()),
                api_key_env: "MISTRAL_API_KEY",
                api_key_present: true,
            }
        } else if present("XAI_API_KEY") {
            ModelProvider {
                provider: "xai",
                model: lookup("XAI_MODEL")
                    .unwrap_or_else(|| "grok-4-1-fast-reasoning".to_string()),
                api_key_env: "XAI_API_KEY",
                api_key_present: true,
            }
        } else {
            ModelProvider {
                provider: "openai",
                model: lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                api_key_env: "OPENAI_API_KEY",
                api_key_present: present("OPENAI_API_KEY"),
            }
        };

        let x_credentials = X_CREDENTIAL_VARS
            .iter()
            .map(|name| (name.to_string(), present(name)))
            .collect();

        Self {
            model,
            x_credentials,
        }
    }

    /// Whether every social-platform credential is set
    pub fn x_credentials_complete(&self) -> bool {
        self.x_credentials.iter().all(|(_, set)| *set)
    }
}
