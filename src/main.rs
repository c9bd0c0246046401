//! Entry point for mcp-chat.
use std::process::ExitCode;

use clap::Parser;
use mcp_chat::{
    cli::{run_chat, LaunchProfile, LaunchProfileArgs, ParsedCommand},
    config::AppConfig,
    lib::telemetry,
    server::runtime::{self, RuntimeExit},
};

const CLIENT_LOG_LEVEL: &str = "warn";
const SERVER_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    let args = LaunchProfileArgs::parse();
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::Serve => {
            telemetry::init_tracing(SERVER_LOG_LEVEL).map_err(RuntimeExit::from_error)?;
            runtime::run_server().await
        }
        ParsedCommand::Chat(profile) => {
            telemetry::init_tracing(CLIENT_LOG_LEVEL).map_err(RuntimeExit::from_error)?;
            chat(profile).await
        }
    }
}

async fn chat(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let config = AppConfig::load(&profile.config_source, &profile.overrides)
        .map_err(RuntimeExit::from_error)?;
    run_chat(profile, config)
        .await
        .map_err(RuntimeExit::from_error)
}
