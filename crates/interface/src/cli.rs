//! CLI - Command Line Interface
//!
//! Available Commands:
//! - jobassist serve            - Start the web chat (default)
//! - jobassist ask -m "..."     - Ask one question and print the answer
//! - jobassist tools            - List the MCP tools the assistant can use

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobassist_core::{AssistantConfig, ConfigError, ConfigLoader};
use jobassist_runtime::McpConnector;

use crate::server::run_server;
use crate::session::{AssistantSession, SessionError, default_provider_factory};

/// CLI Errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Server error: {0}")]
    Server(String),
}

/// jobassist CLI
#[derive(Parser, Debug)]
#[command(name = "jobassist")]
#[command(author, version, about = "Job-search chat assistant over the Adzuna MCP server", long_about = None)]
pub(crate) struct Cli {
    /// Config file (defaults to ./jobassist.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Start the web chat
    Serve(ServeArgs),

    /// Ask a single question
    Ask(AskArgs),

    /// List available MCP tools
    Tools,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Listen address (overrides config and JOBASSIST_ADDRESS)
    #[arg(short, long)]
    pub address: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AskArgs {
    /// Question to ask
    #[arg(short = 'm', long)]
    pub message: String,
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing(cli.verbose);

    let loader = match cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => cmd_serve(args, config).await,
        Commands::Ask(args) => cmd_ask(args, config).await,
        Commands::Tools => cmd_tools(config).await,
    }
}

/// `RUST_LOG` wins unless `-v` is given
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_session(config: AssistantConfig) -> Arc<AssistantSession> {
    let connector = Arc::new(McpConnector::from_settings(&config.mcp));
    Arc::new(AssistantSession::new(
        config,
        connector,
        default_provider_factory(),
    ))
}

async fn cmd_serve(args: ServeArgs, config: AssistantConfig) -> Result<(), CliError> {
    let address = args
        .address
        .unwrap_or_else(|| config.server.address.clone());
    info!(
        mcp_server = %config.mcp.server_url,
        model = %config.llm.model,
        "Starting web chat"
    );

    let session = build_session(config);
    run_server(session, &address)
        .await
        .map_err(|e| CliError::Server(format!("{:#}", e)))
}

async fn cmd_ask(args: AskArgs, config: AssistantConfig) -> Result<(), CliError> {
    let session = build_session(config);
    let result = session.invoke(&args.message, &[]).await;
    session.close().await;

    println!("{}", result?);
    Ok(())
}

async fn cmd_tools(config: AssistantConfig) -> Result<(), CliError> {
    let session = build_session(config);
    let markdown = session.describe_tools().await;
    session.close().await;

    println!("{}", markdown);
    Ok(())
}
