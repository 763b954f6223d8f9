//! Core types for Projector
//!
//! Snapshots handed from the core to the HTTP layer. None of these are
//! persisted; each is computed on demand.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No capture process
    #[default]
    Idle,
    /// Stream directory reset and capture process spawning
    Starting,
    /// Capture process alive and writing segments
    Running,
    /// Capture process being terminated
    Stopping,
}

impl SessionState {
    /// Whether a new session may be started from this state
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Lower-case name, as used in JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// Whether `self -> next` is an edge of the session state machine
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Idle)
                | (Running, Stopping)
                | (Running, Idle)
                | (Stopping, Idle)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Published view of the session, readable without taking the session lock
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Current state
    pub state: SessionState,
    /// Selected source while not idle
    pub source_id: Option<String>,
    /// When the current session entered Starting
    pub started_at: Option<SystemTime>,
}

impl SessionSnapshot {
    /// Whether the encoder is up and producing segments
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

/// Status returned by `GET /api/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    /// Whether a stream is live
    pub running: bool,
    /// This machine's LAN address
    #[serde(rename = "ip")]
    pub host_address: String,
    /// Link for viewers, only while running
    pub viewer_url: Option<String>,
    /// Session state name
    pub state: SessionState,
    /// Selected source while not idle
    pub source: Option<String>,
}

impl StatusView {
    /// Derive the view from a session snapshot and the advertised address
    pub fn from_snapshot(snapshot: &SessionSnapshot, host_address: String, port: u16) -> Self {
        let running = snapshot.is_running();
        let viewer_url = running.then(|| format!("http://{}:{}", host_address, port));
        Self {
            running,
            host_address,
            viewer_url,
            state: snapshot.state,
            source: snapshot.source_id.clone(),
        }
    }
}

/// A capture source offered to the presenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Identifier passed back in a start request
    pub id: String,
    /// Human-readable name
    pub label: String,
}

impl SourceInfo {
    /// Create a new source info
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.id, self.label)
    }
}
