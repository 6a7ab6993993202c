// crates/server/src/main.rs
//! Jobwatch server binary.
//!
//! Serves the job polling API and runs the reaper that reclaims expired jobs.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jobwatch_server::{create_app, demo, AppState, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobwatch", version, about = "Poll long-running background jobs over HTTP")]
struct Cli {
    /// TOML config file (port, [monitor], [runner] sections).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides the config file and JOBWATCH_PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Seed a few sample jobs to poll.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet by default; RUST_LOG=jobwatch_core=debug etc. for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let mut config = ServerConfig::load(cli.config.as_deref())
        .with_context(|| "Failed to load server configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    eprintln!("\n\u{23f3} jobwatch v{}\n", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(&config);
    let _reaper = state.jobs.spawn_reaper();

    if cli.demo {
        let handles = demo::seed_demo_jobs(&state.jobs);
        eprintln!("  Demo jobs: {}", handles.iter().map(|h| h.to_string()).collect::<Vec<_>>().join(", "));
    }

    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");
    eprintln!("  \u{2192} http://localhost:{}\n", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
