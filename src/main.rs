//! Compass CLI - Local-first task tracking with dependency-aware ready queues

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = compass::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
