//! Configuration types for Projector
//!
//! Runtime configuration for the capture process, the HLS output directory,
//! session timing, and the HTTP listener. [`ConfigFile`] is the on-disk form;
//! [`ConfigFile::into_runtime`] validates it into a [`ProjectorConfig`].

mod file;

pub use file::{sample_config, ConfigFile};

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ProjectorError, Result};

/// File name of the HLS playlist inside the stream directory
pub const MANIFEST_NAME: &str = "stream.m3u8";

/// Segment file pattern handed to the HLS muxer
pub const SEGMENT_PATTERN: &str = "seg%03d.ts";

/// Default stream directory
pub const DEFAULT_HLS_DIR: &str = "/tmp/projector-stream";

/// Capture-and-encode process settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// ffmpeg binary (name on PATH or absolute path)
    pub ffmpeg: PathBuf,
    /// ffmpeg input device format (e.g. "avfoundation")
    pub input_format: String,
    /// Capture framerate, also used as the GOP length
    pub framerate: u32,
    /// Hardware video encoder name
    pub encoder: String,
    /// Target bitrate in ffmpeg notation (e.g. "3M")
    pub bitrate: String,
    /// Draw the mouse cursor into the capture
    pub capture_cursor: bool,
    /// Source used when a start request does not name one
    pub default_source: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            input_format: "avfoundation".to_string(),
            framerate: 30,
            encoder: "h264_videotoolbox".to_string(),
            bitrate: "3M".to_string(),
            capture_cursor: true,
            default_source: "3".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Set the ffmpeg binary
    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Set the capture framerate
    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    /// Set the video encoder
    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = encoder.into();
        self
    }
}

/// HLS output settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsConfig {
    /// Directory the encoder writes into; owned by the capture session
    pub dir: PathBuf,
    /// Target segment duration in seconds
    pub segment_seconds: u32,
    /// Number of segments kept in the rolling playlist
    pub list_size: u32,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_HLS_DIR),
            segment_seconds: 1,
            list_size: 3,
        }
    }
}

impl HlsConfig {
    /// Create HLS settings rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Full path of the playlist
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_NAME)
    }

    /// Full segment path pattern for the muxer
    pub fn segment_pattern(&self) -> PathBuf {
        self.dir.join(SEGMENT_PATTERN)
    }
}

/// Session timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long stop waits for a graceful exit before killing
    pub stop_grace: Duration,
    /// Interval of the liveness poll
    pub poll_interval: Duration,
    /// Window after spawn in which an exit counts as a launch failure
    pub startup_check: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(500),
            startup_check: Duration::from_millis(750),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Host advertised in viewer URLs; detected when unset
    pub advertise_host: Option<String>,
    /// Directory with `viewer.html` / `control.html` overriding the built-in pages
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            advertise_host: None,
            static_dir: None,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectorConfig {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub hls: HlsConfig,
    pub session: SessionConfig,
}

impl ProjectorConfig {
    /// Check values the encoder or the session loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.capture.framerate == 0 {
            return Err(ProjectorError::config("capture.framerate must be greater than 0"));
        }
        if self.capture.encoder.trim().is_empty() {
            return Err(ProjectorError::config("capture.encoder must not be empty"));
        }
        if self.hls.segment_seconds == 0 {
            return Err(ProjectorError::config("hls.segment_seconds must be greater than 0"));
        }
        if self.hls.list_size == 0 {
            return Err(ProjectorError::config("hls.list_size must be greater than 0"));
        }
        if self.session.poll_interval.is_zero() {
            return Err(ProjectorError::config("session.poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ProjectorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_hls_dir() {
        assert_eq!(HlsConfig::default().dir, PathBuf::from("/tmp/projector-stream"));
    }

    #[test]
    fn test_zero_framerate_rejected() {
        let mut config = ProjectorConfig::default();
        config.capture = config.capture.with_framerate(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("framerate"));
    }

    #[test]
    fn test_hls_paths() {
        let hls = HlsConfig::new("/srv/stream");
        assert_eq!(hls.manifest_path(), PathBuf::from("/srv/stream/stream.m3u8"));
        assert_eq!(hls.segment_pattern(), PathBuf::from("/srv/stream/seg%03d.ts"));
    }
}
