//! sweepkv - A Single-Threaded In-Memory Key-Value Cache
//!
//! This is the main entry point for the sweepkv server.
//! It parses the command line, sets up logging, and runs the event loop on a
//! dedicated blocking thread while the async runtime waits for Ctrl+C.

use std::time::Duration;
use sweepkv::server::{Server, ServerConfig, ServerError};
use sweepkv::storage::CacheStore;
use tokio::signal;
use tokio::task::JoinError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Parse configuration from command-line arguments
fn config_from_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                config.host = option_value(&args, i, "--host").to_string();
                i += 2;
            }
            "--port" | "-p" => {
                config.port = option_value(&args, i, "--port")
                    .parse()
                    .unwrap_or_else(|_| fail("invalid port number"));
                i += 2;
            }
            "--sweep-interval" => {
                let millis: u64 = option_value(&args, i, "--sweep-interval")
                    .parse()
                    .unwrap_or_else(|_| fail("invalid sweep interval"));
                if millis == 0 {
                    fail("sweep interval must be at least 1 ms");
                }
                config.sweep_interval = Duration::from_millis(millis);
                i += 2;
            }
            "--max-connections" => {
                config.max_connections = option_value(&args, i, "--max-connections")
                    .parse()
                    .unwrap_or_else(|_| fail("invalid connection count"));
                i += 2;
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("sweepkv version {}", sweepkv::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

/// Returns the value following the option at `args[i]`, or exits.
fn option_value<'a>(args: &'a [String], i: usize, name: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => fail(&format!("{} requires a value", name)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_help() {
    println!(
        r#"
sweepkv - A Single-Threaded In-Memory Key-Value Cache

USAGE:
    sweepkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 7171)
        --sweep-interval <MS>      Milliseconds between expiry sweeps (default: 1000)
        --max-connections <N>      Poller capacity hint (default: 20000)
    -v, --version                  Print version information
        --help                     Print this help message

ENVIRONMENT:
    RUST_LOG                       Log filter (default: info)

CONNECTING:
    Any line-oriented TCP client works:
    $ nc 127.0.0.1 7171
    SET name sweepkv
    Success
    SET session abc123 60
    Success
    GET name
    sweepkv
    HAS missing
    No
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
sweepkv v{} - Single-Threaded In-Memory Key-Value Cache
──────────────────────────────────────────────────────────────
Listening on {}
Expiry sweep every {} ms

Use Ctrl+C to shutdown gracefully.
"#,
        sweepkv::VERSION,
        config.bind_address(),
        config.sweep_interval.as_millis()
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    let mut server = Server::bind(&config, CacheStore::new())?;
    let shutdown = server.shutdown_handle();
    info!(address = %server.local_addr(), "Listening");

    // The event loop blocks its thread; keep it off the runtime
    let mut event_loop = tokio::task::spawn_blocking(move || server.start());

    tokio::select! {
        joined = &mut event_loop => return finish(joined),
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received, stopping server...");
            shutdown.shutdown();
        }
    }

    finish(event_loop.await)
}

/// Maps the event loop's exit into the process result.
fn finish(joined: Result<Result<(), ServerError>, JoinError>) -> anyhow::Result<()> {
    match joined? {
        Ok(()) => {
            info!("Server shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Event loop failed");
            Err(e.into())
        }
    }
}
