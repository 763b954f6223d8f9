//! Capture-and-encode process launching
//!
//! [`FfmpegLauncher`] turns the capture and HLS settings into an ffmpeg
//! command line and spawns it. The session only sees the [`ProcessLauncher`]
//! trait, so tests can substitute any program that writes into the stream
//! directory.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;
use tracing::debug;

use crate::config::{CaptureConfig, HlsConfig};
use crate::error::{ProjectorError, Result};

/// Lines of encoder stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// Spawns the external capture-and-encode process
pub trait ProcessLauncher: Send + Sync {
    /// Start capturing `source_id` into the stream directory.
    ///
    /// Returns as soon as the process is spawned; stderr must be piped so the
    /// session can report why an early exit happened.
    fn launch(&self, source_id: &str) -> Result<Child>;
}

/// Launches ffmpeg writing HLS into the configured directory
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    capture: CaptureConfig,
    hls: HlsConfig,
}

impl FfmpegLauncher {
    /// Create a launcher for the given settings
    pub fn new(capture: CaptureConfig, hls: HlsConfig) -> Self {
        Self { capture, hls }
    }

    /// Full argument list (without the program) for `source_id`
    pub fn args(&self, source_id: &str) -> Vec<OsString> {
        let fps = self.capture.framerate.to_string();

        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "warning"]
            .into_iter()
            .map(OsString::from)
            .collect();

        args.extend(
            [
                "-f",
                self.capture.input_format.as_str(),
                "-framerate",
                fps.as_str(),
            ]
            .map(OsString::from),
        );
        if self.capture.capture_cursor {
            args.extend(["-capture_cursor", "1"].map(OsString::from));
        }
        args.extend(
            [
                "-i".to_string(),
                format!("{}:none", source_id),
                "-enc_time_base".to_string(),
                format!("1/{}", fps),
                "-c:v".to_string(),
                self.capture.encoder.clone(),
                "-b:v".to_string(),
                self.capture.bitrate.clone(),
                "-g".to_string(),
                fps.clone(),
                "-f".to_string(),
                "hls".to_string(),
                "-hls_time".to_string(),
                self.hls.segment_seconds.to_string(),
                "-hls_list_size".to_string(),
                self.hls.list_size.to_string(),
                "-hls_flags".to_string(),
                "delete_segments+independent_segments+temp_file".to_string(),
                "-hls_segment_filename".to_string(),
            ]
            .map(OsString::from),
        );
        args.push(self.hls.segment_pattern().into_os_string());
        args.push(self.hls.manifest_path().into_os_string());
        args
    }
}

impl ProcessLauncher for FfmpegLauncher {
    fn launch(&self, source_id: &str) -> Result<Child> {
        debug!("Launching {} for source {}", self.capture.ffmpeg.display(), source_id);

        Command::new(&self.capture.ffmpeg)
            .args(self.args(source_id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProjectorError::launch(format!("{}: {}", self.capture.ffmpeg.display(), e))
            })
    }
}

/// Last lines written to a child's stderr
#[derive(Debug, Clone)]
pub struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    closed: watch::Receiver<bool>,
}

impl Default for StderrTail {
    /// A tail with nothing attached, already closed
    fn default() -> Self {
        let (_, closed) = watch::channel(true);
        Self {
            lines: Arc::default(),
            closed,
        }
    }
}

impl StderrTail {
    /// Drain `stderr` on a background task until it closes
    ///
    /// Keeping the pipe drained means a chatty encoder never blocks on a full pipe.
    pub fn drain(stderr: ChildStderr) -> Self {
        let (closed_tx, closed) = watch::channel(false);
        let tail = Self {
            lines: Arc::default(),
            closed,
        };
        let lines = tail.lines.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(target: "projector::encoder", "{}", line);
                let mut lines = lines.lock();
                if lines.len() == STDERR_TAIL_LINES {
                    lines.pop_front();
                }
                lines.push_back(line);
            }
            let _ = closed_tx.send(true);
        });

        tail
    }

    /// Wait up to `timeout` for the pipe to close, so the tail is complete
    pub async fn settle(&self, timeout: Duration) {
        let mut closed = self.closed.clone();
        let _ = tokio::time::timeout(timeout, closed.wait_for(|done| *done)).await;
    }

    /// Joined tail, oldest line first
    pub fn text(&self) -> String {
        self.lines.lock().iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// Ask a child to exit (SIGTERM)
pub fn request_termination(child: &Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped
        return Ok(());
    };

    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs
    // to a child we have not reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
