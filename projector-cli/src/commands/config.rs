//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use projector_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective settings (file merged over defaults)
    Show,

    /// Write a commented config file to the default path
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            let note = if path.exists() { "exists" } else { "not created yet" };
            println!("{} ({})", path.display(), note);
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            let file = ConfigFile::load_from(path.clone())?;
            let config = file.into_runtime().context("Config file has invalid values")?;

            if path.exists() {
                println!("Configuration file: {}\n", path.display());
            } else {
                println!("No configuration file, showing defaults.\n");
            }

            println!("Server:");
            println!("  Listen:          {}:{}", config.server.bind, config.server.port);
            println!(
                "  Advertise host:  {}",
                config.server.advertise_host.as_deref().unwrap_or("(detected)")
            );
            if let Some(dir) = &config.server.static_dir {
                println!("  Static pages:    {}", dir.display());
            }
            println!();
            println!("Capture:");
            println!("  ffmpeg:          {}", config.capture.ffmpeg.display());
            println!("  Input format:    {}", config.capture.input_format);
            println!("  Framerate:       {} fps", config.capture.framerate);
            println!("  Encoder:         {} @ {}", config.capture.encoder, config.capture.bitrate);
            println!("  Cursor:          {}", config.capture.capture_cursor);
            println!("  Default source:  {}", config.capture.default_source);
            println!();
            println!("HLS:");
            println!("  Directory:       {}", config.hls.dir.display());
            println!("  Segment length:  {} s", config.hls.segment_seconds);
            println!("  Playlist size:   {}", config.hls.list_size);
            println!();
            println!("Session:");
            println!("  Stop grace:      {:?}", config.session.stop_grace);
            println!("  Poll interval:   {:?}", config.session.poll_interval);
            println!("  Startup check:   {:?}", config.session.startup_check);
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();

            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
