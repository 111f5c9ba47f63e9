//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// adder-pool - rendezvous-based distributed integer aggregation
#[derive(Parser, Debug)]
#[command(name = "adder-pool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Local TCP port the driver connects back to (1024-65535)
    ///
    /// Kept as text so validation can reject anything that is not plain digits.
    #[arg(value_name = "PORT")]
    pub port: String,

    /// Driver host name or address
    #[arg(value_name = "HOST")]
    pub host: String,

    /// TOML configuration file with a [session] table
    #[arg(short = 'c', long, env = "ADDER_POOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// UDP port the driver listens on for announcements
    #[arg(long)]
    pub driver_port: Option<u16>,

    /// Rendezvous attempts before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Accept timeout per rendezvous attempt and worker count timeout (e.g., 5s, 500ms)
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Read timeout for each driver command (e.g., 60s, 2m)
    #[arg(long)]
    pub command_timeout: Option<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
