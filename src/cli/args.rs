//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};

use super::{resolve_config_source, resolve_overrides, LaunchProfile};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    Chat(LaunchProfile),
    Serve,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run the built-in document tool server over stdio.
    #[command(about = "Run the built-in document MCP server over stdio")]
    Serve,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcp-chat",
    author,
    version,
    about = "Chat with a model that can use tools from MCP servers",
    long_about = None,
    args_conflicts_with_subcommands = true,
    after_help = "Each SERVER_COMMAND is a command line such as \"uv run notes_server.py\"; \
                  it is launched next to the built-in document server."
)]
pub struct LaunchProfileArgs {
    /// Answer one query, print the answer, and exit.
    #[arg(long, value_name = "QUERY")]
    pub once: Option<String>,
    /// Path to the TOML config (overrides MCP_CHAT_CONFIG).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
    /// Model identifier (overrides CLAUDE_MODEL and the config file).
    #[arg(long = "model")]
    pub model_override: Option<String>,
    /// Additional MCP servers to launch.
    #[arg(value_name = "SERVER_COMMAND")]
    pub server_commands: Vec<String>,
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

impl LaunchProfileArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(self) -> Result<LaunchProfile> {
        let config_source = resolve_config_source(self.config_override)?;
        let overrides = resolve_overrides(self.model_override);

        Ok(LaunchProfile {
            once: self.once,
            config_source,
            overrides,
            server_commands: self.server_commands,
        })
    }

    /// Parse CLI args into either chat mode or the server subcommand.
    ///
    /// Once a chat option has been seen clap stops matching subcommand
    /// names, so `--once hi serve` arrives as a server command named
    /// `serve`. That mix is rejected here.
    pub fn into_command(self) -> Result<ParsedCommand> {
        match self.command {
            Some(CliCommand::Serve) => Ok(ParsedCommand::Serve),
            None => {
                let cli = Self::command();
                if let Some(name) = self
                    .server_commands
                    .iter()
                    .map(|line| line.trim())
                    .find(|line| cli.find_subcommand(line).is_some())
                {
                    bail!("`{name}` is a subcommand and cannot be combined with chat arguments");
                }
                Ok(ParsedCommand::Chat(self.build()?))
            }
        }
    }
}
