//! pomo server - pomodoro and countdown sessions, driven from the console

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use pomo_utils::{LogConfig, Result};

mod cli;
mod commands;
mod config;
mod console;
mod controller;
mod handlers;
mod registry;
mod runner;
mod services;
mod session;
mod supervisor;
#[cfg(test)]
mod testing;
mod types;

use cli::Args;
use config::{AppConfig, ConfigLoader, DEFAULT_CONFIG_TOML};
use console::{print_output, ConsoleHost, ConsoleServices, Output};
use controller::SessionController;
use registry::SessionRegistry;

/// Load the configuration named on the command line, or the default one
fn load_config(args: &Args) -> Result<AppConfig> {
    match &args.config {
        Some(path) => ConfigLoader::load_path_and_validate(path),
        None => ConfigLoader::load_and_validate(),
    }
}

/// Run the console host until stdin closes or the process is interrupted
async fn run_console(config: AppConfig) -> Result<()> {
    info!("pomo server starting");

    let (out, rx) = Output::channel();
    let printer = tokio::spawn(print_output(rx));

    let console = ConsoleServices::new(&out);
    let controller = SessionController::new(
        Arc::new(SessionRegistry::new()),
        console.services(),
        Arc::new(config),
    );
    let host = ConsoleHost::new(controller.clone(), console, out);
    let stdin = BufReader::new(tokio::io::stdin());

    let result = tokio::select! {
        result = host.run(stdin) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    // Graceful shutdown
    controller.shutdown().await;
    drop(host);
    drop(controller);

    // Session tasks drop their output handles as they observe cancellation
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("Console output did not drain before exit");
    }

    info!("pomo server stopped");
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", DEFAULT_CONFIG_TOML.trim_start());
        return Ok(());
    }

    let log_config = if args.dev {
        LogConfig::development()
    } else {
        LogConfig::server()
    };
    let log_config = match &args.log_filter {
        Some(filter) => log_config.with_filter(filter.clone()),
        None => log_config,
    };
    pomo_utils::init_logging_with_config(log_config)?;

    let config = load_config(&args)?;
    run_console(config).await
}
