//! ldb
//!
//! Maintenance and inspection tool for an ldbkit store.
//!
//! ```text
//! ldb --db=<path> <command> [flags] [args]
//! ```

use std::io::{self, Write};

use ldbkit::cli::router;
use ldbkit::LdbError;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Logs go to stderr; stdout carries only the command result
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut out = stdout.lock();

    let err = match router::run_with_io(std::env::args_os(), &mut input, &mut out) {
        Ok(()) => return,
        Err(err) => err,
    };

    match &err {
        LdbError::Help(text) => {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
        LdbError::Usage(message) => eprintln!("{}", message),
        other => eprintln!("Failed: {}", other),
    }

    std::process::exit(err.exit_code());
}
