//! showfile - open a file in Preview sized for the current display
//!
//! Binary entry point: parses arguments, sets up logging, loads the
//! configuration and dispatches the command.

use clap::Parser;
use showfile::{
    cli::{ShowFileCli, ShowFileCliExecutor},
    config::ConfigParser,
    logging::{init_logging, LogConfig},
    Result, ShowFileError,
};
use tracing::{debug, error};

async fn run(cli: ShowFileCli) -> Result<()> {
    let mut parser = ConfigParser::new();
    let config = parser
        .load(cli.config.as_deref())
        .map_err(ShowFileError::from)?;

    let executor = ShowFileCliExecutor::new(config, cli.browser, cli.json);
    debug!("Using {:?} browser", executor.browser_kind());
    executor.execute(cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = ShowFileCli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    }
    .with_env();
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
