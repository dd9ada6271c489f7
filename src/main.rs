//! Stream Latency Tester - Main CLI Application
//!
//! Opens several concurrent connections to one streaming feed and reports
//! which connection receives updates first.

use clap::Parser;
use stream_latency_tester::{
    app::App,
    cli::Cli,
    error::{panic_exit_code, AppError, ErrorReporter},
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        if let Some(code) = panic_exit_code(std::thread::current().name()) {
            process::exit(code);
        }
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see --env-help)");
            eprintln!("  - BASE_URL must start with ws:// or wss://");
            eprintln!("  - NUM_CONNECTIONS must be between 1 and {}", stream_latency_tester::defaults::MAX_CONNECTIONS);
        }
        AppError::Connect(_) | AppError::Stream(_) => {
            eprintln!();
            eprintln!("Connection troubleshooting:");
            eprintln!("  - Check that the feed endpoint is reachable");
            eprintln!("  - Increase --retry-limit or --retry-delay");
        }
        _ => {}
    }
}
