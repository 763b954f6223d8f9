//! Screen capture via an external ffmpeg process
//!
//! This module handles:
//! - Source enumeration through ffmpeg's device listing
//! - Building and spawning the capture-and-encode command

pub mod devices;
pub mod launcher;

pub use devices::{parse_device_list, DeviceEnumerator, FfmpegDeviceEnumerator};
pub use launcher::{FfmpegLauncher, ProcessLauncher, StderrTail};

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::types::SourceInfo;

/// List available capture sources with the default ffmpeg enumerator
pub async fn list_sources(capture: &CaptureConfig) -> Result<Vec<SourceInfo>> {
    FfmpegDeviceEnumerator::new(capture).list_sources().await
}
