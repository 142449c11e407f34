//! cs-client-map - Main entry point

use clap::Parser;
use csmap_cli::error::EXIT_CONFIG;
use csmap_cli::Cli;
use csmap_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A .env file next to the binary's working directory may carry credentials
    let _ = dotenvy::dotenv();

    // Usage errors are configuration errors, not clap's default status 2,
    // which is reserved for authentication failures.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_CONFIG } else { 0 };
            let _ = e.print();
            process::exit(code);
        },
    };

    if cli.version {
        println!("{}", csmap_cli::version_line());
        return;
    }

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("cs-client-map")
        .build();

    // A bad LOG_* value falls back to the flag-derived config
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {:#}", e);
            log_config
        },
    };

    // Logging is best effort; the report does not depend on it
    let _ = init_logging(&log_config);

    if let Err(e) = csmap_cli::run(&cli).await {
        error!(error = %e, "Run failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
