use mcp_file_bridge::config::ServerConfig;
use mcp_file_bridge::server::BridgeServer;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-file-bridge: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let mut server = match BridgeServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mcp-file-bridge: startup error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("mcp-file-bridge: fatal error: {e}");
        std::process::exit(1);
    }
}
