use std::{fs, process};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uplink::cli::{self, Cli};

/// Fatal setup errors are also left here for operators who only see the folder.
const ERROR_FILE: &str = "ERROR.txt";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {e}");
        if let Err(write_err) = fs::write(ERROR_FILE, format!("{e}\n")) {
            eprintln!("Could not write {ERROR_FILE}: {write_err}");
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "uplink=debug" } else { "uplink=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
