//! EmberKV - A Durable In-Memory Key-Value Server
//!
//! This is the main entry point for the EmberKV server.
//! It parses the command line, sets up logging, restores the store from the
//! append-only log and serves clients until Ctrl+C.

use clap::Parser;
use emberkv::{Server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line options
#[derive(Debug, Parser)]
#[command(author, version, about = "A durable in-memory key-value server", long_about = None)]
struct Cli {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = emberkv::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = emberkv::DEFAULT_PORT)]
    port: u16,

    /// Path of the append-only log
    #[arg(short, long, default_value = emberkv::DEFAULT_AOF_PATH)]
    aof_path: PathBuf,

    /// How often the log is synced to disk, in milliseconds
    #[arg(long, default_value_t = 1000)]
    flush_interval_ms: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            aof_path: self.aof_path.clone(),
            flush_interval: Duration::from_millis(self.flush_interval_ms),
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
EmberKV v{} - Durable In-Memory Key-Value Server
──────────────────────────────────────────────────
Listening on     {}
Append-only log  {}

Use Ctrl+C to shutdown gracefully.
"#,
        emberkv::VERSION,
        config.bind_address(),
        config.aof_path.display()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.config();
    let server = Server::bind(&config).await?;

    print_banner(&config);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    server.run(shutdown).await?;
    info!("Bye");
    Ok(())
}
