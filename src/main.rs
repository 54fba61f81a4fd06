//! xpost - draft and publish X/Twitter posts from the command line
//!
//! Acts as a minimal agent runtime around the plugin: it shows the text,
//! asks the operator, and only then publishes.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use tracing::info;
use xpost_agent::config::{Config, EnvironmentReport};
use xpost_agent::logging::init_tracing;
use xpost_agent::plugins::{ToolDefinition, AGENT_INSTRUCTIONS};
use xpost_agent::prompt::confirm_publish;
use xpost_agent::{AgentPlugin, PluginContext, PublishResult, XPostPlugin};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.tool_server.host = host;
    }
    if let Some(port) = args.port {
        config.tool_server.port = port;
    }
    config.validate()?;

    init_tracing(&config.logging, args.debug).context("Failed to initialize logging")?;
    info!("Starting xpost v{}", env!("CARGO_PKG_VERSION"));

    let mut plugin = XPostPlugin::new(&config);
    plugin
        .on_start(PluginContext {
            tool_server: config.tool_server.clone(),
            agent_name: Some("xpost-cli".to_string()),
        })
        .await?;

    match args.command {
        Command::Draft {
            text,
            style,
            no_hashtags,
            max_length,
        } => {
            let mut request = plugin.draft_request(text);
            if let Some(style) = style {
                request = request.style(style.as_str());
            }
            if no_hashtags {
                request = request.include_hashtags(false);
            }
            if let Some(max_length) = max_length {
                request = request.max_length(max_length);
            }

            let output = plugin.create_post(request).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Publish { text, yes } => {
            let approved = yes || confirm_publish(&text, &mut io::stdin().lock(), &mut io::stdout())?;
            let result = plugin.publish_post(&text, approved).await?;

            match result {
                PublishResult::Submitted(output) => {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                PublishResult::ConfirmationRequired { .. } => {
                    println!("Not published.");
                }
            }
        }

        Command::Tools => {
            let schemas: Vec<_> = plugin
                .tools()
                .iter()
                .map(ToolDefinition::to_function_schema)
                .collect();
            let value = serde_json::json!({
                "plugin": {
                    "name": plugin.name(),
                    "version": plugin.version(),
                    "description": plugin.description(),
                },
                "tools": schemas,
                "instructions": AGENT_INSTRUCTIONS,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        Command::Status => {
            println!(
                "{}",
                cli::render_status(&config, &EnvironmentReport::collect())
            );
        }
    }

    info!("xpost exited");
    Ok(())
}
