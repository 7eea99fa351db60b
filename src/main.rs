use mcp_note_bridge::config::ServerConfig;
use mcp_note_bridge::server::McpServer;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("mcp-note-bridge: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let server = match McpServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            error!("mcp-note-bridge: invalid note store URL: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("mcp-note-bridge: fatal error: {e}");
        std::process::exit(1);
    }
}
