use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Hazard monitor CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "hazard-monitor",
    version,
    about = "Sensor hazard alerting with debounce and escalation"
)]
pub struct Cli {
    /// Sensor device to read (`-` for standard input)
    #[arg(long)]
    pub device: Option<String>,

    /// Address for the HTTP API
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// JSON threshold table replacing the reference thresholds
    #[arg(long)]
    pub thresholds: Option<PathBuf>,

    /// Seconds a hazard must persist before escalating
    #[arg(long)]
    pub escalation_delay: Option<u64>,
}
