//! jbscrape - find used iPhones still running a jailbreakable iOS version

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = jbscrape::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
