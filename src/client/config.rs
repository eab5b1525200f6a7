//! Client configuration & CLI surface (A2, §4.7).

use std::time::Duration;

use clap::Parser;

fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw)
}

/// Configuration information for launching an instance of the relay client.
#[derive(Parser, Clone, Debug)]
#[command(name = "relay-client", about = "Random-peer message relay client")]
pub struct ClientConfig {
    /// Server endpoint to connect to.
    #[arg(long, default_value = "localhost:8080")]
    pub target: String,

    /// Retransmission interval; accepts shorthand like `1s` or `500ms`.
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub deadline: Duration,

    /// Whether to run the observability sidecar (health/metrics).
    #[arg(long = "sidecar-enabled", default_value_t = true)]
    pub sidecar_enabled: bool,

    /// Port the observability sidecar listens on.
    #[arg(long = "sidecar-port", default_value_t = 9091)]
    pub sidecar_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: "localhost:8080".to_string(),
            deadline: Duration::from_secs(30),
            sidecar_enabled: true,
            sidecar_port: 9091,
        }
    }
}
