//! lobe-vq specific configuration

use clap::Parser;
use std::path::PathBuf;

/// Verification queue service configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "lobe-vq", about = "Lobe verification queue service")]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LOBE_VQ_BIND", default_value = "127.0.0.1:5780")]
    pub bind: String,

    /// Path to the shared SQLite database
    #[arg(long, env = "LOBE_DB", default_value = "lobe.db")]
    pub db: PathBuf,

    /// Path to the reward table TOML (built-in defaults when absent)
    #[arg(long, env = "LOBE_ECONOMY", default_value = "economy.toml")]
    pub economy: PathBuf,
}
