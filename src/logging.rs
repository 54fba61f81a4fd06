//! Logging module
//!
//! Sets up diagnostic tracing and keeps an audit trail of draft and
//! publish attempts, so every post that may have reached the social
//! platform can be traced afterwards.

use crate::config::{AuditConfig, LogConfig};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Session ID for the current process
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Secret patterns for redaction
static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // API keys and tokens
        Regex::new(
            r#"(?i)(api[_-]?key|token|secret|password|passwd|pwd)\s*[=:]\s*['"]?([^'"\s]+)['"]?"#,
        )
        .unwrap(),
        // Bearer tokens
        Regex::new(r"(?i)bearer\s+[a-zA-Z0-9._-]+").unwrap(),
        // Generic long alphanumeric strings that might be keys
        Regex::new(r"[a-zA-Z0-9_-]{32,}").unwrap(),
    ]
});

/// Install the global tracing subscriber
pub fn init_tracing(config: &LogConfig, debug: bool) -> std::io::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let json = config.format == "json";
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = std::sync::Mutex::new(file);
            if json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            }
        }
        None if json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        None => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();
    Ok(())
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Session ID
    pub session_id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event: AuditEvent,
    /// Invocation ID, when routed through the dispatcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Post or input text
    pub text: String,
    /// Length of the text in characters
    pub text_chars: usize,
    /// Tool-server response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    /// Error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Types of audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    /// Draft requested from the tool server
    Draft,
    /// Publish stopped locally for lack of confirmation
    PublishUnconfirmed,
    /// Publish accepted by the tool server
    Publish,
    /// Tool server rejected the publish
    PublishFailed,
    /// Publish sent but outcome unknown
    PublishUnknown,
}

/// Writes the audit trail as JSON lines
pub struct AuditLogger {
    config: AuditConfig,
    log_file: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger. The log file is opened on the first record.
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            log_file: None,
        }
    }

    /// A logger that records nothing
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..AuditConfig::default()
            },
            log_file: None,
        }
    }

    /// Open or create the log file
    fn open_log_file(path: &Path) -> Option<BufWriter<File>> {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create audit log directory: {}", e);
                return None;
            }
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                error!("Failed to open audit log {:?}: {}", path, e);
                None
            }
        }
    }

    /// Record an event
    pub fn record(
        &mut self,
        event: AuditEvent,
        invocation_id: Option<&str>,
        text: &str,
        response: Option<&serde_json::Value>,
        error: Option<&str>,
    ) {
        if !self.config.enabled {
            return;
        }

        let entry = AuditEntry {
            session_id: SESSION_ID.clone(),
            timestamp: Utc::now(),
            event,
            invocation_id: invocation_id.map(str::to_string),
            text: truncate_preview(&self.redact_if_needed(text)),
            text_chars: text.chars().count(),
            response_preview: response
                .map(|r| truncate_preview(&self.redact_if_needed(&r.to_string()))),
            error: error.map(|e| self.redact_if_needed(e)),
        };

        self.maybe_rotate();
        self.write_entry(&entry);
    }

    /// Write a log entry
    fn write_entry(&mut self, entry: &AuditEntry) {
        if self.log_file.is_none() {
            self.log_file = Self::open_log_file(&self.config.path);
        }
        if let Some(ref mut file) = self.log_file {
            match serde_json::to_string(entry) {
                Ok(json) => {
                    if let Err(e) = writeln!(file, "{}", json) {
                        error!("Failed to write audit entry: {}", e);
                    }
                    if let Err(e) = file.flush() {
                        warn!("Failed to flush audit log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize audit entry: {}", e);
                }
            }
        }
    }

    fn redact_if_needed(&self, text: &str) -> String {
        if self.config.redact_secrets {
            redact_secrets(text)
        } else {
            text.to_string()
        }
    }

    /// Rotate log file if needed
    fn maybe_rotate(&mut self) {
        let path = &self.config.path;
        if let Ok(metadata) = fs::metadata(path) {
            if metadata.len() > self.config.max_log_size {
                self.rotate_logs();
            }
        }
    }

    /// Rotate log files
    fn rotate_logs(&mut self) {
        let path = self.config.path.clone();
        debug!("Rotating audit log");

        // Close current file
        self.log_file = None;

        for i in (1..self.config.log_retention).rev() {
            let old = format!("{}.{}", path.display(), i);
            let new = format!("{}.{}", path.display(), i + 1);
            let _ = fs::rename(&old, &new);
        }

        let rotated = format!("{}.1", path.display());
        let _ = fs::rename(&path, &rotated);
    }
}

/// Redact secrets from text
fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in SECRET_PATTERNS.iter() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

/// Truncate text for preview, on a character boundary
fn truncate_preview(text: &str) -> String {
    const MAX_PREVIEW: usize = 500;
    match text.char_indices().nth(MAX_PREVIEW) {
        Some((idx, _)) => format!("{}...[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
