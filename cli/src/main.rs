use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use switchboard_core::Config;
use switchboard_core::ConfigOverrides;
use switchboard_core::DEFAULT_BIND_ADDR;

/// Switchboard control plane.
///
/// Drives interactive AI-assistant CLI subprocesses on behalf of browser
/// clients: start/stop over HTTP, live output over SSE, conversation
/// history from the assistant's own log files.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// Program spawned for each conversation.
    #[arg(long, default_value = "agent")]
    launcher: String,

    /// Root of the assistant's on-disk state (defaults to ~/.agent).
    #[arg(long, value_name = "DIR")]
    agent_home: Option<PathBuf>,

    /// Explicit MCP config file forwarded to the launcher.
    #[arg(long, value_name = "FILE")]
    mcp_config: Option<PathBuf>,

    /// Fully-qualified MCP tool name used for permission prompts.
    #[arg(long, value_name = "TOOL")]
    permission_prompt_tool: Option<String>,

    /// Command line for the companion permission server; required when a
    /// permission prompt tool is set and no MCP config is given.
    #[arg(long, value_name = "CMD", num_args = 1.., value_delimiter = ' ')]
    permission_server_command: Option<Vec<String>>,

    /// Bound on the number of agent turns per conversation.
    #[arg(long, value_name = "N")]
    max_turns: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(ConfigOverrides {
        launcher: Some(cli.launcher),
        agent_home: cli.agent_home,
        bind_addr: Some(cli.bind),
        max_turns: cli.max_turns,
        mcp_config_path: cli.mcp_config,
        permission_prompt_tool: cli.permission_prompt_tool,
        permission_server_command: cli.permission_server_command,
    })?;

    switchboard_server::run_main(config).await
}
