use std::path::PathBuf;

use crate::transport::Framing;

/// Default boundary location, relative to the server's working directory.
const DEFAULT_SANDBOX_ROOT: &str = "./mcp_sandbox";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub sandbox_root: PathBuf,
    pub framing: Framing,
    pub relay_tools: bool,
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `FILEBRIDGE_SANDBOX_ROOT` (optional, default `./mcp_sandbox`) — boundary directory
    /// - `FILEBRIDGE_FRAMING` (optional, `header` | `line`, default `header`) — outgoing framing
    /// - `FILEBRIDGE_RELAY_TOOLS` (optional, `1`/`true`/`yes`) — register the relay mailbox tools
    pub fn from_env() -> Result<Self, String> {
        let sandbox_root = std::env::var("FILEBRIDGE_SANDBOX_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SANDBOX_ROOT));

        let framing = match std::env::var("FILEBRIDGE_FRAMING") {
            Ok(val) => val
                .parse::<Framing>()
                .map_err(|e| format!("FILEBRIDGE_FRAMING: {e}"))?,
            Err(_) => Framing::Header,
        };

        let relay_tools = match std::env::var("FILEBRIDGE_RELAY_TOOLS") {
            Ok(val) => matches!(val.as_str(), "1" | "true" | "yes"),
            Err(_) => false,
        };

        Ok(Self {
            sandbox_root,
            framing,
            relay_tools,
        })
    }
}
