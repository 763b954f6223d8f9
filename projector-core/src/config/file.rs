//! Configuration file loading
//!
//! Loads user configuration from `~/.config/projector/config.toml`

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CaptureConfig, HlsConfig, ProjectorConfig, ServerConfig, SessionConfig, DEFAULT_HLS_DIR};
use crate::error::{ProjectorError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Capture process settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// HLS output settings
    #[serde(default)]
    pub hls: HlsSettings,

    /// Session timing
    #[serde(default)]
    pub session: SessionSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Host shown to viewers (auto-detected when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_host: Option<String>,

    /// Directory with page overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

/// Capture process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// ffmpeg binary
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Input device format
    #[serde(default = "default_input_format")]
    pub input_format: String,

    /// Capture framerate
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// Hardware encoder
    #[serde(default = "default_encoder")]
    pub encoder: String,

    /// Target bitrate
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Draw the cursor
    #[serde(default = "default_true")]
    pub capture_cursor: bool,

    /// Source used when the control page sends none
    #[serde(default = "default_source")]
    pub default_source: String,
}

/// HLS output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsSettings {
    /// Stream directory
    #[serde(default = "default_hls_dir")]
    pub dir: PathBuf,

    /// Segment duration in seconds
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    /// Playlist length in segments
    #[serde(default = "default_list_size")]
    pub list_size: u32,
}

/// Session timing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Grace period before a stop escalates to SIGKILL
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Liveness poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Early-exit detection window after spawn
    #[serde(default = "default_startup_check_ms")]
    pub startup_check_ms: u64,
}

// Default value functions
fn default_port() -> u16 {
    8000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_input_format() -> String {
    "avfoundation".to_string()
}

fn default_framerate() -> u32 {
    30
}

fn default_encoder() -> String {
    "h264_videotoolbox".to_string()
}

fn default_bitrate() -> String {
    "3M".to_string()
}

fn default_true() -> bool {
    true
}

fn default_source() -> String {
    "3".to_string()
}

fn default_hls_dir() -> PathBuf {
    PathBuf::from(DEFAULT_HLS_DIR)
}

fn default_segment_seconds() -> u32 {
    1
}

fn default_list_size() -> u32 {
    3
}

fn default_stop_grace_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_startup_check_ms() -> u64 {
    750
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            advertise_host: None,
            static_dir: None,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            input_format: default_input_format(),
            framerate: default_framerate(),
            encoder: default_encoder(),
            bitrate: default_bitrate(),
            capture_cursor: true,
            default_source: default_source(),
        }
    }
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            dir: default_hls_dir(),
            segment_seconds: default_segment_seconds(),
            list_size: default_list_size(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stop_grace_ms: default_stop_grace_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            startup_check_ms: default_startup_check_ms(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("projector").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("projector")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/projector/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ProjectorError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProjectorError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ProjectorError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| ProjectorError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Convert into validated runtime configuration
    pub fn into_runtime(self) -> Result<ProjectorConfig> {
        let bind: IpAddr = self.server.bind.parse().map_err(|_| {
            ProjectorError::config(format!("Invalid bind address: {}", self.server.bind))
        })?;

        let config = ProjectorConfig {
            server: ServerConfig {
                bind,
                port: self.server.port,
                advertise_host: self.server.advertise_host,
                static_dir: self.server.static_dir,
            },
            capture: CaptureConfig {
                ffmpeg: PathBuf::from(self.capture.ffmpeg),
                input_format: self.capture.input_format,
                framerate: self.capture.framerate,
                encoder: self.capture.encoder,
                bitrate: self.capture.bitrate,
                capture_cursor: self.capture.capture_cursor,
                default_source: self.capture.default_source,
            },
            hls: HlsConfig {
                dir: self.hls.dir,
                segment_seconds: self.hls.segment_seconds,
                list_size: self.hls.list_size,
            },
            session: SessionConfig {
                stop_grace: Duration::from_millis(self.session.stop_grace_ms),
                poll_interval: Duration::from_millis(self.session.poll_interval_ms),
                startup_check: Duration::from_millis(self.session.startup_check_ms),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Projector Configuration

[server]
# Port for the control page, viewer page and HLS files
port = 8000

# Bind address (0.0.0.0 = reachable from the local network)
bind = "0.0.0.0"

# Host shown in viewer links; detected from the default route when unset
# advertise_host = "192.168.1.20"

# Directory containing viewer.html / control.html to replace the built-in pages
# static_dir = "/usr/share/projector"

[capture]
# ffmpeg binary (name on PATH or absolute path)
ffmpeg = "ffmpeg"

# ffmpeg input device format
input_format = "avfoundation"

# Capture framerate (also the keyframe interval)
framerate = 30

# Hardware video encoder
encoder = "h264_videotoolbox"

# Target bitrate
bitrate = "3M"

# Draw the mouse cursor
capture_cursor = true

# Source used when the control page does not pick one
default_source = "3"

[hls]
# Stream directory; playlist and segment files are cleared at the start of every share
dir = "/tmp/projector-stream"

# Segment length in seconds (lower = less latency, more requests)
segment_seconds = 1

# Segments kept in the rolling playlist
list_size = 3

[session]
# How long Stop waits for ffmpeg to exit before killing it
stop_grace_ms = 2000

# How often the running encoder is checked for unexpected exit
poll_interval_ms = 500

# An encoder exit within this window after Start is reported as a launch failure
startup_check_ms = 750
"#
    .to_string()
}
