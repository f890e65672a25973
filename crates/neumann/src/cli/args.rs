use std::path::PathBuf;

use clap::Parser;
use neumann_openai_model::DEFAULT_ENDPOINT;

/// The model requested when none is configured.
const DEFAULT_MODEL: &str = "Qwen3-Coder-30B-A3B-Instruct-Q4_K_M.gguf";

/// neumann (neu) - universal constructor for code
#[derive(Debug, Parser)]
#[command(name = "neu", version)]
pub struct Args {
    /// Chat-completion endpoint.
    #[arg(long, env = "NEU_API_URL", default_value = DEFAULT_ENDPOINT)]
    pub api_url: String,

    /// Model name sent with every request.
    #[arg(long, env = "MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Bearer token, only sent when set.
    #[arg(long, env = "NEU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Custom system prompt.
    #[arg(long)]
    pub system: Option<String>,

    /// Directory to load external tools from.
    #[arg(long, env = "NEU_TOOL_DIR")]
    pub tool_dir: Option<PathBuf>,

    /// Print raw API responses for debugging.
    #[arg(long)]
    pub raw: bool,

    /// Also advertise tools through the native tool-calling interface.
    #[arg(long)]
    pub native_tools: bool,

    /// Time budget of one tool call.
    #[arg(
        long,
        env = "NEU_TOOL_TIMEOUT",
        default_value_t = 120,
        value_name = "SECS"
    )]
    pub tool_timeout: u64,
}
