//! GSC Controller CLI entry point

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use gsc_controller::cli::formatter_for;
use gsc_controller::{Cli, Config, ExitCode};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Create default config on first run
    if cli.config.is_none() {
        if let Err(e) = Config::create_default_if_missing() {
            eprintln!("Warning: Could not create default config: {e}");
        }
    }

    let config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Config error: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Command-line flags take precedence over the config file
    let config = config.with_overrides(&cli.overrides());

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let formatter = formatter_for(&config);

    // Flags bypass the load-time check
    if let Err(e) = config.validate() {
        if !formatter.is_quiet() {
            eprintln!(
                "{}",
                formatter.format_error_with_code(&e.to_string(), ExitCode::InvalidInput)
            );
        }
        return ExitCode::InvalidInput.to_exit_code();
    }

    match cli.execute_with_config(config).await {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            let code = ExitCode::for_error(&e);
            let message = format!("{e:#}");
            if !formatter.is_quiet() {
                eprintln!("{}", formatter.format_error_with_code(&message, code));
            }
            code.to_exit_code()
        }
    }
}
