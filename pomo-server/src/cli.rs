//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// pomo - pomodoro and countdown sessions for group rooms
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file
    ///
    /// Defaults to config.toml in the pomo config directory. A missing
    /// default file means built-in defaults; a missing explicit file is an
    /// error.
    #[arg(long, short = 'c', env = "POMO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "pomo_server=debug,info"
    ///
    /// Overrides the POMO_LOG environment variable.
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Verbose logging to stderr only
    #[arg(long, default_value_t = false)]
    pub dev: bool,

    /// Print the default configuration and exit
    #[arg(long, default_value_t = false)]
    pub print_default_config: bool,
}
