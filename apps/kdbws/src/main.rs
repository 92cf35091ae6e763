use kdbws::cli::Cli;
use kdbws::error::{KdbWsError, exit_code};
use kdbws::logger::initialize as LoggerInitialize;

use relay_core::config::BridgeConfig;
use relay_core::run_bridge;
use relay_core::tls::load_connector;

use common::ErrorLocation;

use std::convert::Infallible;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use log::{error, info};
use tokio::runtime::Builder as RuntimeBuilder;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    ExitCode::from(exit_code::SUCCESS)
                }
                _ => ExitCode::from(exit_code::CONFIG),
            };
        }
    };

    let log_guard = match LoggerInitialize(cli.proc_log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let Err(e) = run(cli);
    error!("Fatal: {e}");
    let code = e.exit_code();

    info!("kdbws exiting with code {code}");
    drop(log_guard);
    ExitCode::from(code)
}

/// Validate the configuration, then relay until a fatal error.
///
/// The relay has no clean shutdown, so this only ever returns the error that
/// ended it.
fn run(cli: Cli) -> Result<Infallible, KdbWsError> {
    info!("kdbws starting");

    let config: BridgeConfig = cli.into_builder().build()?;
    config.log_summary();

    let tls = match &config.target.tls {
        Some(files) => Some(load_connector(files)?),
        None => None,
    };

    let runtime = RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| KdbWsError::Runtime {
            message: format!("Failed to build async runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let fatal = runtime.block_on(run_bridge(&config, tls));
    runtime.shutdown_background();

    Err(KdbWsError::Relay(fatal))
}
