//! Computes the launcher argv for a conversation.
//!
//! The launcher is an interactive AI-assistant CLI driven in print mode:
//! one prompt in via argv, line-delimited JSON out via stdout.

use std::path::PathBuf;

use switchboard_protocol::PermissionMode;
use switchboard_protocol::SessionId;

use crate::config::Config;

/// Per-conversation options supplied by the client.
#[derive(Debug, Clone, Default)]
pub struct ConversationParams {
    pub working_directory: PathBuf,
    pub initial_prompt: String,
    pub model: Option<String>,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub system_prompt: Option<String>,
    pub permission_mode: Option<PermissionMode>,
    pub add_dirs: Vec<PathBuf>,
}

/// Start a fresh conversation or resume a previous session.
#[derive(Debug, Clone)]
pub enum LaunchIntent {
    Start,
    Resume { previous_session_id: SessionId },
}

/// Build the full argv, launcher program included.
///
/// The prompt is the final positional argument; everything else is flags.
/// `mcp_config_path` wins over `config.mcp_config_path` so a generated
/// temp config can be injected without mutating the shared `Config`.
pub fn build_argv(
    config: &Config,
    params: &ConversationParams,
    intent: &LaunchIntent,
    mcp_config_path: Option<&PathBuf>,
) -> Vec<String> {
    let mut argv = vec![config.launcher.clone(), "--print".to_string()];

    if let LaunchIntent::Resume {
        previous_session_id,
    } = intent
    {
        argv.push("--resume".to_string());
        argv.push(previous_session_id.to_string());
    }

    argv.push("--output-format".to_string());
    argv.push("stream-json".to_string());
    argv.push("--verbose".to_string());

    if let Some(model) = &params.model {
        argv.push("--model".to_string());
        argv.push(model.clone());
    }
    if !params.allowed_tools.is_empty() {
        argv.push("--allowedTools".to_string());
        argv.push(params.allowed_tools.join(","));
    }
    if !params.disallowed_tools.is_empty() {
        argv.push("--disallowedTools".to_string());
        argv.push(params.disallowed_tools.join(","));
    }
    if let Some(system_prompt) = &params.system_prompt {
        argv.push("--system-prompt".to_string());
        argv.push(system_prompt.clone());
    }
    if let Some(mode) = params.permission_mode {
        argv.push("--permission-mode".to_string());
        argv.push(mode.as_str().to_string());
    }
    if let Some(max_turns) = config.max_turns {
        argv.push("--max-turns".to_string());
        argv.push(max_turns.to_string());
    }
    for dir in &params.add_dirs {
        argv.push("--add-dir".to_string());
        argv.push(dir.to_string_lossy().into_owned());
    }

    let mcp_config = mcp_config_path.or(config.mcp_config_path.as_ref());
    if let Some(path) = mcp_config {
        argv.push("--mcp-config".to_string());
        argv.push(path.to_string_lossy().into_owned());
        if let Some(tool) = &config.permission_prompt_tool {
            argv.push("--permission-prompt-tool".to_string());
            argv.push(tool.clone());
        }
    }

    argv.push(params.initial_prompt.clone());
    argv
}
