use std::process::ExitCode;
use clap::Parser;
use env_logger::Env;
use log::debug;
mod bmp;
mod cli;
mod common;
mod dump;
mod error;
mod stream;
mod transform;
#[cfg(test)]
mod fixtures;


fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = cli::Args::parse();
    debug!("{args:?}");

    let outcome = cli::Request::try_from(args)
        .map_err(anyhow::Error::from)
        .and_then(|request| cli::run(&request));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:?}");
            eprintln!("ERROR: {err:#}");
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
