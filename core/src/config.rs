use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::error::SwitchboardErr;

/// Subdirectory of the agent home that holds per-project conversation logs.
const PROJECTS_SUBDIR: &str = "projects";

/// Default agent home under `$HOME` when no override is given.
const AGENT_HOME_DIR: &str = ".agent";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3789";

/// Runtime configuration for the control plane.
///
/// Populated once at startup from CLI flags; components receive it behind
/// an `Arc` and never mutate it. The timing fields default to the
/// production constants and exist so tests can shrink them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Program spawned for each conversation.
    pub launcher: String,

    /// Root of the assistant's on-disk state. Conversation logs are read
    /// from `<agent_home>/projects/<encoded-project>/<session>.jsonl`.
    pub agent_home: PathBuf,

    pub bind_addr: SocketAddr,

    /// Upper bound passed to every launch as `--max-turns`, when set.
    pub max_turns: Option<u32>,

    /// Explicit MCP config forwarded to the launcher. When unset and a
    /// permission prompt tool is configured, the server generates a
    /// temporary one.
    pub mcp_config_path: Option<PathBuf>,

    /// Fully-qualified MCP tool name the launcher should route permission
    /// prompts through.
    pub permission_prompt_tool: Option<String>,

    /// Command line for the companion permission server, written into the
    /// generated MCP config.
    pub permission_server_command: Vec<String>,

    pub heartbeat_interval: Duration,
    pub stop_soft_grace: Duration,
    pub stop_hard_deadline: Duration,

    /// Maximum concurrent stop operations during graceful shutdown.
    pub shutdown_concurrency: usize,
}

/// Optional overrides applied on top of the defaults, typically sourced
/// from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub launcher: Option<String>,
    pub agent_home: Option<PathBuf>,
    pub bind_addr: Option<SocketAddr>,
    pub max_turns: Option<u32>,
    pub mcp_config_path: Option<PathBuf>,
    pub permission_prompt_tool: Option<String>,
    pub permission_server_command: Option<Vec<String>>,
}

impl Config {
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let ConfigOverrides {
            launcher,
            agent_home,
            bind_addr,
            max_turns,
            mcp_config_path,
            permission_prompt_tool,
            permission_server_command,
        } = overrides;

        let agent_home = match agent_home {
            Some(home) => home,
            None => default_agent_home()?,
        };

        #[allow(clippy::unwrap_used)]
        let bind_addr = bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.parse().unwrap());

        Ok(Self {
            launcher: launcher.unwrap_or_else(|| "agent".to_string()),
            agent_home,
            bind_addr,
            max_turns,
            mcp_config_path,
            permission_prompt_tool,
            permission_server_command: permission_server_command.unwrap_or_default(),
            heartbeat_interval: Duration::from_secs(30),
            stop_soft_grace: Duration::from_millis(100),
            stop_hard_deadline: Duration::from_secs(5),
            shutdown_concurrency: 4,
        })
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.agent_home.join(PROJECTS_SUBDIR)
    }
}

fn default_agent_home() -> Result<PathBuf> {
    let mut home = dirs::home_dir().ok_or_else(|| {
        SwitchboardErr::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not resolve home directory",
        ))
    })?;
    home.push(AGENT_HOME_DIR);
    Ok(home)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let config = Config::load(ConfigOverrides {
            launcher: Some("fake-agent".to_string()),
            agent_home: Some(PathBuf::from("/tmp/agent-home")),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.launcher, "fake-agent");
        assert_eq!(
            config.projects_dir(),
            PathBuf::from("/tmp/agent-home/projects")
        );
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
    }
}
