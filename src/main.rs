// src/main.rs

use std::env;
use std::io;
use std::process::ExitCode;

use log::{error, info};

use leafdb::config::DbConfig;
use leafdb::execution::run_session;
use leafdb::storage::Table;

fn main() -> ExitCode {
    env_logger::init();

    let Some(filename) = env::args().nth(1) else {
        println!("Must supply a database filename.");
        return ExitCode::FAILURE;
    };

    let config = DbConfig::from_env();
    info!("leafdb opening {} ({:?})", filename, config);

    let table = match Table::open(&filename, &config) {
        Ok(table) => table,
        Err(e) => {
            error!("Unable to open {}: {}", filename, e);
            eprintln!("Unable to open {}: {}", filename, e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match run_session(table, stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Session ended with an error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
