#[macro_use] mod core;
mod config;
mod csv;
mod error;
mod mail;
mod message;
mod metrics;
mod report;
mod stat;
mod types;

use std::io::{self, Write};
use std::process::ExitCode;

use easy_logging::LoggingConfig;
use log::{error, info};

fn main() -> ExitCode {
    let config = match config::parse_args() {
        Ok(config) => config,
        Err(err) => {
            let _ = writeln!(io::stderr(), "{err}.");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = LoggingConfig::new(module_path!(), config.log_level).minimal().build() {
        let _ = writeln!(io::stderr(), "Failed to initialize the logging: {err}.");
        return ExitCode::FAILURE;
    }

    let default_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic_hook(info);
        std::process::abort();
    }));

    match report::generate(&config) {
        Ok(status) => {
            info!("{status}.");
            ExitCode::SUCCESS
        },
        Err(err) => {
            error!("{err}.");
            ExitCode::FAILURE
        },
    }
}
