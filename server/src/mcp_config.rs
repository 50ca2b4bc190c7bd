//! Generated MCP config pointing the launcher at the companion
//! permission server.

use std::io::Write;
use std::path::Path;

use serde_json::json;
use tempfile::NamedTempFile;
use tracing::warn;

use switchboard_core::Config;
use switchboard_core::Result;

/// A temp MCP config owned by the server for its whole lifetime. Dropping
/// it during graceful shutdown removes the file.
pub struct GeneratedMcpConfig {
    file: NamedTempFile,
}

impl GeneratedMcpConfig {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Write the config when a permission prompt tool is configured and no
/// explicit MCP config was supplied. The permission server learns where to
/// report through its environment.
pub fn generate(config: &Config) -> Result<Option<GeneratedMcpConfig>> {
    if config.permission_prompt_tool.is_none() || config.mcp_config_path.is_some() {
        return Ok(None);
    }
    let Some((command, args)) = config.permission_server_command.split_first() else {
        warn!("permission prompt tool configured without a permission server command");
        return Ok(None);
    };

    let notify_url = format!("http://{}/api/permissions/notify", config.bind_addr);
    let contents = json!({
        "mcpServers": {
            "permissions": {
                "command": command,
                "args": args,
                "env": { "SWITCHBOARD_NOTIFY_URL": notify_url },
            }
        }
    });

    let mut file = tempfile::Builder::new()
        .prefix("switchboard-mcp-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(serde_json::to_string_pretty(&contents)?.as_bytes())?;
    file.flush()?;
    Ok(Some(GeneratedMcpConfig { file }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;
    use switchboard_core::ConfigOverrides;

    #[test]
    fn generates_only_when_a_tool_is_configured() {
        let config = Config::load(ConfigOverrides {
            agent_home: Some(std::env::temp_dir()),
            ..Default::default()
        })
        .unwrap();
        assert!(generate(&config).unwrap().is_none());
    }

    #[test]
    fn generated_config_names_the_permission_server() {
        let config = Config::load(ConfigOverrides {
            agent_home: Some(std::env::temp_dir()),
            permission_prompt_tool: Some("mcp__permissions__approve".to_string()),
            permission_server_command: Some(vec![
                "switchboard-permissions".to_string(),
                "--quiet".to_string(),
            ]),
            ..Default::default()
        })
        .unwrap();

        let generated = generate(&config).unwrap().unwrap();
        let contents = std::fs::read_to_string(generated.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(
            value["mcpServers"]["permissions"]["command"],
            "switchboard-permissions"
        );
        assert_eq!(value["mcpServers"]["permissions"]["args"][0], "--quiet");

        let path = generated.path().to_path_buf();
        drop(generated);
        assert!(!path.exists());
    }
}
