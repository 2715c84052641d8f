//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

/// Virtual terminal server with transferable read authority
#[derive(Parser, Debug)]
#[command(name = "ttymux-server")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the XDG config dir)
    #[arg(short, long, env = "TTYMUX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Socket path, overriding `general.socket_path`
    #[arg(short, long, env = "TTYMUX_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Log filter used when TTYMUX_LOG is unset, overriding `logging.filter`
    #[arg(long)]
    pub log: Option<String>,

    /// Run an echo application on terminal 0
    #[arg(long)]
    pub demo: bool,

    /// Print the default configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}
