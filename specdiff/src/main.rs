// Copyright 2026 Oxide Computer Company

//! Executable for the specdiff server

use camino::Utf8PathBuf;
use clap::Parser;
use specdiff::start_server;
use specdiff::ConfigSpecDiff;

/// Serve reports of the differences between OpenAPI documents
#[derive(Debug, Parser)]
#[command(name = "specdiff-server", version)]
struct Args {
    /// Path to a TOML configuration file.  Without one, the server listens
    /// on 127.0.0.1:8080 and logs to the terminal at level "info".
    config_file: Option<Utf8PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    let config = match &args.config_file {
        Some(path) => ConfigSpecDiff::from_file(path)
            .map_err(|error| format!("failed to load config: {}", error))?,
        None => ConfigSpecDiff::default(),
    };

    let log = config
        .log
        .to_logger("specdiff")
        .map_err(|error| format!("failed to create logger: {}", error))?;

    let server =
        start_server(&config, &log).map_err(|error| error.to_string())?;
    server.await
}
