//! Capture source enumeration
//!
//! ffmpeg's avfoundation input prints its device list to stderr:
//!
//! ```text
//! [AVFoundation indev @ 0x7f8b] AVFoundation video devices:
//! [AVFoundation indev @ 0x7f8b] [0] FaceTime HD Camera
//! [AVFoundation indev @ 0x7f8b] [3] Capture screen 0
//! ```
//!
//! Only the `Capture screen` entries are offered as sources.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::CaptureConfig;
use crate::error::{ProjectorError, Result};
use crate::types::SourceInfo;

const SCREEN_MARKER: &str = "Capture screen ";

/// Upper bound on a device listing run
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can list the capture sources currently attached
#[async_trait]
pub trait DeviceEnumerator: Send + Sync {
    /// Query the platform for available sources.
    ///
    /// An empty list is a valid answer; `Enumeration` means the query itself failed.
    async fn list_sources(&self) -> Result<Vec<SourceInfo>>;
}

/// Enumerates screens through `ffmpeg -list_devices`
#[derive(Debug, Clone)]
pub struct FfmpegDeviceEnumerator {
    ffmpeg: PathBuf,
    input_format: String,
}

impl FfmpegDeviceEnumerator {
    /// Create an enumerator using the capture settings' binary and input format
    pub fn new(capture: &CaptureConfig) -> Self {
        Self {
            ffmpeg: capture.ffmpeg.clone(),
            input_format: capture.input_format.clone(),
        }
    }
}

#[async_trait]
impl DeviceEnumerator for FfmpegDeviceEnumerator {
    async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        let run = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-f", self.input_format.as_str()])
            .args(["-list_devices", "true", "-i", ""])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        // ffmpeg exits non-zero after listing since no input was opened;
        // only a failure to run at all counts as an enumeration error.
        let output = tokio::time::timeout(LIST_TIMEOUT, run)
            .await
            .map_err(|_| ProjectorError::enumeration("device listing timed out"))?
            .map_err(|e| {
                ProjectorError::enumeration(format!("failed to run {}: {}", self.ffmpeg.display(), e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let sources = parse_device_list(&stderr);
        debug!("Found {} capture sources", sources.len());
        Ok(sources)
    }
}

/// Extract screen sources from ffmpeg's device listing, in listing order
pub fn parse_device_list(text: &str) -> Vec<SourceInfo> {
    text.lines().filter_map(parse_screen_line).collect()
}

fn parse_screen_line(line: &str) -> Option<SourceInfo> {
    let marker = line.find(SCREEN_MARKER)?;

    let prefix = line[..marker].trim_end().strip_suffix(']')?;
    let id = &prefix[prefix.rfind('[')? + 1..];
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let screen: String = line[marker + SCREEN_MARKER.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if screen.is_empty() {
        return None;
    }

    Some(SourceInfo::new(id, format!("Screen {}", screen)))
}
