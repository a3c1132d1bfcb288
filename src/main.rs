//! Binary entrypoint that reconciles the user search list with the directory.

use std::process::ExitCode;

use messenger_core::start_messenger;

/// Open the configured stores and backfill missing search list entries.
fn main() -> ExitCode {
    start_messenger::run()
}
