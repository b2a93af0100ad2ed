use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use cddlgen::logging::{self, Logger, TracingLogger};
use cddlgen::{Args, Config, run};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version go to stdout, everything else to stderr.
            // A failed write falls back to plain stderr.
            if err.print().is_err() {
                eprintln!("error: {err}");
            }
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if let Err(err) = logging::init(args.verbose) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let logger = TracingLogger;
    let result = Config::from_args(&args).and_then(|config| run(&config, &logger));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
