// src/bin/validate_data.rs
//
// Prints a single verdict line on stdout; logs go to stderr.

use journeydata::{logging, validate_dataset, DataLayout};
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    logging::init_tracing("warn");

    let layout = match DataLayout::from_env() {
        Ok(layout) => layout,
        Err(e) => {
            println!("ERROR: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(root = %layout.root().display(), "validating");

    match validate_dataset(&layout) {
        Ok(()) => {
            println!("Data validation passed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
