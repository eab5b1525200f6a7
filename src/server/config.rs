//! Server configuration & CLI surface (A2, §4.7).

use clap::Parser;

/// Configuration information for launching an instance of the relay server.
#[derive(Parser, Clone, Debug)]
#[command(name = "relay-server", about = "Random-peer message relay server")]
pub struct ServerConfig {
    /// TCP listen port for the streaming endpoint.
    #[arg(long = "port", default_value_t = 8080)]
    pub port: u16,

    /// Whether to run the observability sidecar (health/metrics).
    #[arg(long = "sidecar-enabled", default_value_t = true)]
    pub sidecar_enabled: bool,

    /// Port the observability sidecar listens on.
    #[arg(long = "sidecar-port", default_value_t = 9090)]
    pub sidecar_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            sidecar_enabled: true,
            sidecar_port: 9090,
        }
    }
}
