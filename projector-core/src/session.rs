//! Capture session lifecycle
//!
//! Owns the one external capture-and-encode process and the stream directory
//! it writes into. The state machine is
//!
//! ```text
//! Idle ──start──▶ Starting ──spawned──▶ Running ──stop──▶ Stopping ──reaped──▶ Idle
//!                    │                     │
//!                    └──launch failed──▶ Idle ◀──process exited──┘
//! ```
//!
//! Every transition happens while holding `core`, an async mutex, so start,
//! stop and the liveness monitor never interleave. The state is also
//! published to a snapshot behind a synchronous lock, which is what status
//! queries read; they never wait on a transition or on the process.

use std::future::Future;
use std::io;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::capture::launcher::{request_termination, FfmpegLauncher, ProcessLauncher, StderrTail};
use crate::config::{ProjectorConfig, SessionConfig};
use crate::error::{ProjectorError, Result, ResultExt};
use crate::store::SegmentStore;
use crate::types::{SessionSnapshot, SessionState, StatusView};

/// Poll step while waiting out the startup check window
const STARTUP_POLL: Duration = Duration::from_millis(50);

/// How long to wait for the reap after SIGKILL
const KILL_WAIT: Duration = Duration::from_secs(2);

/// How long to let the stderr drain catch up after an early exit
const STDERR_SETTLE: Duration = Duration::from_millis(200);

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running
    NotRunning,
    /// The process exited after SIGTERM within the grace period
    Graceful,
    /// The process had to be killed
    Forced,
}

/// The single capture session of this server
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<Shared>,
}

struct Shared {
    core: Mutex<Core>,
    snapshot: RwLock<SessionSnapshot>,
    store: SegmentStore,
    launcher: Arc<dyn ProcessLauncher>,
    config: SessionConfig,
}

#[derive(Default)]
struct Core {
    state: SessionState,
    source_id: Option<String>,
    started_at: Option<SystemTime>,
    child: Option<Child>,
    stderr: Option<StderrTail>,
    /// Bumped on every start, so a monitor never acts on a later session
    generation: u64,
    monitor: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Create an idle session
    ///
    /// `launcher` must write into the directory `store` manages.
    pub fn new(store: SegmentStore, launcher: Arc<dyn ProcessLauncher>, config: SessionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core::default()),
                snapshot: RwLock::new(SessionSnapshot::default()),
                store,
                launcher,
                config,
            }),
        }
    }

    /// Create an idle session launching ffmpeg per `config`
    pub fn from_config(config: &ProjectorConfig) -> Self {
        let launcher = FfmpegLauncher::new(config.capture.clone(), config.hls.clone());
        Self::new(
            SegmentStore::new(config.hls.dir.clone()),
            Arc::new(launcher),
            config.session,
        )
    }

    /// The stream directory this session writes into
    pub fn store(&self) -> &SegmentStore {
        &self.shared.store
    }

    /// Start capturing `source_id`
    ///
    /// Fails with `AlreadyRunning` unless idle. On any other failure the
    /// session is back to idle when this returns.
    pub async fn start(&self, source_id: impl Into<String>) -> Result<()> {
        if !self.state().is_idle() {
            return Err(ProjectorError::AlreadyRunning);
        }

        let shared = self.shared.clone();
        let source_id = source_id.into();
        run_detached(async move { shared.start(source_id).await }).await
    }

    /// Stop the running capture, if any
    ///
    /// Idempotent: stopping an idle session succeeds with
    /// [`StopOutcome::NotRunning`]. The session is idle when this returns,
    /// even when it returns `ProcessUnresponsive`.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let shared = self.shared.clone();
        run_detached(async move { shared.stop().await }).await
    }

    /// Stop on server exit, logging instead of returning errors
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(StopOutcome::NotRunning) => {}
            Ok(outcome) => info!("Capture stopped on shutdown ({:?})", outcome),
            Err(e) => warn!("Failed to stop capture on shutdown: {}", e),
        }
    }

    /// Last published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot.read().clone()
    }

    /// Last published state name
    pub fn state(&self) -> SessionState {
        self.shared.snapshot.read().state
    }

    /// Whether a stream is live
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Status for viewers and the control page
    pub fn status(&self, host_address: impl Into<String>, port: u16) -> StatusView {
        StatusView::from_snapshot(&self.snapshot(), host_address.into(), port)
    }

    /// PID of the capture process while one is owned
    pub async fn process_id(&self) -> Option<u32> {
        let core = self.shared.core.lock().await;
        core.child.as_ref().and_then(Child::id)
    }
}

impl Shared {
    /// Move to `next` and publish the snapshot. Caller holds `core`.
    fn transition(&self, core: &mut Core, next: SessionState) {
        debug_assert!(
            core.state.can_transition_to(next),
            "illegal transition {} -> {}",
            core.state,
            next
        );
        debug!("Capture session {} -> {}", core.state, next);

        core.state = next;
        if next == SessionState::Idle {
            core.source_id = None;
            core.started_at = None;
        }

        *self.snapshot.write() = SessionSnapshot {
            state: next,
            source_id: core.source_id.clone(),
            started_at: core.started_at,
        };
    }

    async fn start(self: Arc<Self>, source_id: String) -> Result<()> {
        let mut core = self.core.lock().await;
        if !core.state.is_idle() {
            return Err(ProjectorError::AlreadyRunning);
        }

        core.generation += 1;
        core.source_id = Some(source_id.clone());
        core.started_at = Some(SystemTime::now());
        self.transition(&mut core, SessionState::Starting);
        info!("Starting capture of source {}", source_id);

        match self.launch(&source_id).await {
            Ok((child, stderr)) => {
                let pid = child.id();
                core.child = Some(child);
                core.stderr = Some(stderr);
                self.transition(&mut core, SessionState::Running);
                core.monitor = Some(self.spawn_monitor(core.generation));
                info!("Capture running (source {}, pid {:?})", source_id, pid);
                Ok(())
            }
            Err(e) => {
                warn!("Capture of source {} failed to start: {}", source_id, e);
                self.transition(&mut core, SessionState::Idle);
                Err(e)
            }
        }
    }

    /// Reset the stream directory, spawn the process, and watch it through
    /// the startup window
    async fn launch(&self, source_id: &str) -> Result<(Child, StderrTail)> {
        self.store
            .reset()
            .await
            .context("Failed to prepare stream directory")?;

        let mut child = self.launcher.launch(source_id)?;
        let stderr = child
            .stderr
            .take()
            .map(StderrTail::drain)
            .unwrap_or_default();

        let deadline = Instant::now() + self.config.startup_check;
        loop {
            if let Some(status) = child.try_wait()? {
                stderr.settle(STDERR_SETTLE).await;
                let output = stderr.text();
                let mut msg = format!("process exited during startup ({})", status);
                if !output.is_empty() {
                    msg.push_str(": ");
                    msg.push_str(&output);
                }
                return Err(ProjectorError::launch(msg));
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(STARTUP_POLL.min(deadline - now)).await;
        }

        Ok((child, stderr))
    }

    fn spawn_monitor(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(self);
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if !shared.poll_liveness(generation) {
                    return;
                }
            }
        })
    }

    /// One non-blocking liveness check. Returns false once there is nothing
    /// left for this monitor to watch.
    fn poll_liveness(&self, generation: u64) -> bool {
        // A start or stop is in flight; check again next tick
        let Ok(mut core) = self.core.try_lock() else {
            return true;
        };

        if core.generation != generation || core.state != SessionState::Running {
            return false;
        }
        let Some(child) = core.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                let output = core.stderr.as_ref().map(StderrTail::text).unwrap_or_default();
                warn!(
                    "Capture process exited unexpectedly ({}); last output:\n{}",
                    status, output
                );
                core.child = None;
                core.stderr = None;
                core.monitor = None;
                self.transition(&mut core, SessionState::Idle);
                false
            }
            Err(e) => {
                warn!("Failed to poll capture process: {}", e);
                true
            }
        }
    }

    async fn stop(self: Arc<Self>) -> Result<StopOutcome> {
        let mut core = self.core.lock().await;
        if core.state.is_idle() {
            debug!("Stop requested while idle");
            return Ok(StopOutcome::NotRunning);
        }

        if let Some(monitor) = core.monitor.take() {
            monitor.abort();
        }
        self.transition(&mut core, SessionState::Stopping);
        info!("Stopping capture");

        let result = match core.child.take() {
            Some(mut child) => terminate(&mut child, self.config.stop_grace).await,
            None => Ok(StopOutcome::Graceful),
        };

        core.stderr = None;
        self.transition(&mut core, SessionState::Idle);
        match &result {
            Ok(outcome) => info!("Capture stopped ({:?})", outcome),
            Err(e) => warn!("Capture stopped with error: {}", e),
        }
        result
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL and reap
async fn terminate(child: &mut Child, grace: Duration) -> Result<StopOutcome> {
    if let Err(e) = request_termination(child) {
        warn!("Failed to signal capture process: {}", e);
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!("Capture process exited with {}", status);
            return Ok(StopOutcome::Graceful);
        }
        Ok(Err(e)) => warn!("Failed waiting for capture process: {}", e),
        Err(_) => warn!("Capture process ignored SIGTERM for {:?}, killing", grace),
    }

    match tokio::time::timeout(KILL_WAIT, child.kill()).await {
        Ok(Ok(())) => Ok(StopOutcome::Forced),
        Ok(Err(e)) => Err(ProjectorError::unresponsive(format!("kill failed: {}", e))),
        Err(_) => Err(ProjectorError::unresponsive(format!(
            "still running {:?} after SIGKILL",
            KILL_WAIT
        ))),
    }
}

/// Run a transition on its own task, so dropping the caller (a disconnected
/// HTTP client) cannot abandon it halfway.
async fn run_detached<T, F>(fut: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ProjectorError::Io(io::Error::new(
            io::ErrorKind::Interrupted,
            e.to_string(),
        ))),
    }
}
