//! List sources command

use anyhow::{Context, Result};
use projector_core::capture;
use projector_core::config::ConfigFile;

/// List available capture sources
pub async fn list_sources() -> Result<()> {
    let config = ConfigFile::load_or_default().into_runtime()?;

    println!("Projector - Available Capture Sources\n");

    let sources = capture::list_sources(&config.capture)
        .await
        .context("Failed to query capture sources")?;

    if sources.is_empty() {
        println!("No screens found.");
        println!("\nNote: ffmpeg ran but reported no capture screens.");
        println!("Check that your terminal has Screen Recording permission.");
        return Ok(());
    }

    println!("{:<6} {}", "ID", "Name");
    println!("{}", "-".repeat(30));

    for source in &sources {
        let marker = if source.id == config.capture.default_source {
            " (default)"
        } else {
            ""
        };
        println!("{:<6} {}{}", source.id, source.label, marker);
    }

    println!("\nPick a screen on the control page, or set capture.default_source in the config.");

    Ok(())
}
