//! tether-host entry point.
//!
//! ```text
//! tether-host                    Run in the foreground, records on stdin
//! tether-host --config <path>    Load a custom config TOML
//! tether-host --endpoint <url>   Override the operator endpoint
//! tether-host --surface <png>    Serve captures of this image
//! tether-host --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_host::config::HostConfig;
use tether_host::service::HostService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tether-host", about = "Remote command channel reference host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tether-host.toml")]
    config: PathBuf,

    /// Operator endpoint, overriding the config file.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Image served as the capture surface, overriding the config file.
    #[arg(short, long)]
    surface: Option<PathBuf>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", HostConfig::default_toml()?);
        return Ok(());
    }

    let mut config = HostConfig::load(&cli.config);
    if let Some(endpoint) = cli.endpoint {
        config.client.endpoint = endpoint;
    }
    if let Some(surface) = cli.surface {
        config.surface.image = surface.display().to_string();
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("tether-host v{}", env!("CARGO_PKG_VERSION"));
    info!("endpoint: {}", config.client.endpoint);
    info!("capture timeout: {:?}", config.client.capture_timeout());

    let service = HostService::new(config);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    let phase = service.run().await?;
    info!(%phase, "exiting");
    Ok(())
}
