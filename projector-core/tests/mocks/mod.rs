//! Mock infrastructure for testing
//!
//! Stands in for ffmpeg with small shell scripts and for the platform device
//! listing with a canned answer.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use projector_core::capture::{DeviceEnumerator, ProcessLauncher};
use projector_core::config::SessionConfig;
use projector_core::error::{ProjectorError, Result};
use projector_core::{CaptureSession, SegmentStore, SourceInfo};
use tempfile::TempDir;
use tokio::process::{Child, Command};

/// Playlist written by the streaming scripts
pub const TEST_MANIFEST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:1\n#EXTINF:1.0,\nseg000.ts\n";

/// Segment payload written by the streaming scripts
pub const TEST_SEGMENT: &[u8] = b"GTS-SEGMENT";

const WRITE_FILES: &str = r#"printf '#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:1\n#EXTINF:1.0,\nseg000.ts\n' > "$1/stream.m3u8"; printf 'GTS-SEGMENT' > "$1/seg000.ts""#;

/// Launches `sh -c <script> sh <stream dir>` instead of ffmpeg
pub struct ScriptLauncher {
    script: String,
    dir: PathBuf,
    launches: Arc<AtomicUsize>,
}

impl ScriptLauncher {
    fn new(dir: &Path, script: String) -> Self {
        Self {
            script,
            dir: dir.to_path_buf(),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Writes a playlist and a segment, then runs until terminated
    pub fn streaming(dir: &Path) -> Self {
        Self::new(dir, format!("{}; exec sleep 30", WRITE_FILES))
    }

    /// Like `streaming`, but ignores SIGTERM
    pub fn ignoring_term(dir: &Path) -> Self {
        Self::new(
            dir,
            format!("trap '' TERM; {}; while true; do sleep 1; done", WRITE_FILES),
        )
    }

    /// Prints `message` to stderr and exits immediately with status 1
    pub fn failing(dir: &Path, message: &str) -> Self {
        Self::new(dir, format!("echo '{}' >&2; exit 1", message))
    }

    /// Streams for `after`, then exits on its own
    pub fn exiting_after(dir: &Path, after: Duration) -> Self {
        Self::new(
            dir,
            format!("{}; sleep {:.3}; exit 0", WRITE_FILES, after.as_secs_f64()),
        )
    }

    /// Shared launch counter
    pub fn launches(&self) -> Arc<AtomicUsize> {
        self.launches.clone()
    }
}

impl ProcessLauncher for ScriptLauncher {
    fn launch(&self, _source_id: &str) -> Result<Child> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Command::new("sh")
            .arg("-c")
            .arg(&self.script)
            .arg("sh")
            .arg(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProjectorError::launch(e.to_string()))
    }
}

/// Enumerator returning a fixed answer
pub struct ScriptedEnumerator {
    answer: std::result::Result<Vec<SourceInfo>, String>,
}

impl ScriptedEnumerator {
    /// Two screens, ids "1" and "2"
    pub fn two_screens() -> Self {
        Self {
            answer: Ok(vec![
                SourceInfo::new("1", "Screen 0"),
                SourceInfo::new("2", "Screen 1"),
            ]),
        }
    }

    /// Always fails with an enumeration error
    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl DeviceEnumerator for ScriptedEnumerator {
    async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        self.answer.clone().map_err(ProjectorError::enumeration)
    }
}

/// Short timings so the lifecycle tests finish quickly
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        stop_grace: Duration::from_millis(300),
        poll_interval: Duration::from_millis(50),
        startup_check: Duration::from_millis(150),
    }
}

/// A temp dir and the stream directory inside it
pub fn stream_dir() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("stream");
    (tmp, dir)
}

/// Session over `dir` driven by `launcher`
pub fn session_with(dir: &Path, launcher: ScriptLauncher) -> CaptureSession {
    CaptureSession::new(
        SegmentStore::new(dir),
        Arc::new(launcher),
        fast_session_config(),
    )
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
