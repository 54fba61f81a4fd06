//! Command-line argument parsing for xpost

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xpost_agent::config::{Config, EnvironmentReport};

/// xpost - draft and publish X/Twitter posts through a post-creator tool server
#[derive(Parser, Debug)]
#[command(name = "xpost")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Tool server host (overrides config and MCP_HOST)
    #[arg(long, value_name = "HOST", global = true)]
    pub host: Option<String>,

    /// Tool server port (overrides config and MCP_PORT)
    #[arg(short, long, value_name = "PORT", global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draft a post from input text
    Draft {
        /// Text to turn into a post
        text: String,

        /// Writing style: professional, casual, witty, inspirational
        #[arg(short, long)]
        style: Option<String>,

        /// Leave hashtags out
        #[arg(long)]
        no_hashtags: bool,

        /// Maximum characters
        #[arg(short, long, value_name = "N")]
        max_length: Option<u32>,
    },

    /// Publish a post after confirmation
    Publish {
        /// Exact text to publish
        text: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print tool schemas and agent instructions as JSON
    Tools,

    /// Show resolved settings and credential presence
    Status,
}

/// Human-readable summary for `xpost status`
pub fn render_status(config: &Config, report: &EnvironmentReport) -> String {
    let presence = |set: bool| if set { "set" } else { "missing" };

    let credentials: Vec<String> = report
        .x_credentials
        .iter()
        .map(|(name, set)| format!("{} {}", name, presence(*set)))
        .collect();

    let audit = if config.audit.enabled {
        config.audit.path.display().to_string()
    } else {
        "disabled".to_string()
    };

    format!(
        "Tool server:   {} (timeout {}s)\n\
         Model:         {} / {} ({} {})\n\
         X credentials: {}\n\
         Audit log:     {}",
        config.tool_server.endpoint(),
        config.tool_server.timeout,
        report.model.provider,
        report.model.model,
        report.model.api_key_env,
        presence(report.model.api_key_present),
        credentials.join(", "),
        audit,
    )
}
