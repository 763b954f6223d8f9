//! Serve command - run the gateway until interrupted

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use projector_core::config::ConfigFile;
use projector_core::gateway::{self, GatewayState};
use projector_core::net::advertised_host;
use tracing::{error, info};

/// Arguments for the serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Config file (defaults to the user config path)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// Host or IP shown in viewer links
    #[arg(long)]
    pub advertise: Option<String>,

    /// Capture framerate
    #[arg(short, long)]
    pub framerate: Option<u32>,

    /// Stream directory for the playlist and segments
    #[arg(long)]
    pub hls_dir: Option<PathBuf>,

    /// Directory with viewer.html / control.html overrides
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Run the server
pub async fn serve(args: ServeArgs) -> Result<()> {
    let mut file = match args.config {
        Some(path) => ConfigFile::load_from(path).context("Failed to load config file")?,
        None => ConfigFile::load_or_default(),
    };

    if let Some(port) = args.port {
        file.server.port = port;
    }
    if let Some(bind) = args.bind {
        file.server.bind = bind.to_string();
    }
    if let Some(host) = args.advertise {
        file.server.advertise_host = Some(host);
    }
    if let Some(fps) = args.framerate {
        file.capture.framerate = fps;
    }
    if let Some(dir) = args.hls_dir {
        file.hls.dir = dir;
    }
    if let Some(dir) = args.static_dir {
        file.server.static_dir = Some(dir);
    }

    let config = file.into_runtime()?;
    let addr = SocketAddr::new(config.server.bind, config.server.port);
    let host = advertised_host(config.server.advertise_host.as_deref());

    info!("Stream directory: {}", config.hls.dir.display());
    info!("Control page → http://localhost:{}/project", config.server.port);
    info!("Viewers      → http://{}:{}", host, config.server.port);

    gateway::serve(GatewayState::from_config(&config), addr, shutdown_signal()).await?;

    info!("Projector stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down...");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
