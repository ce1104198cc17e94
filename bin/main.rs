//! jobassist CLI Entry Point
//!
//! This binary provides the command-line interface for jobassist.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = jobassist_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
