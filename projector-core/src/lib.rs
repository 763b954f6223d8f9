//! Projector Core Library
//!
//! Share a screen with everyone on the LAN through a browser.
//!
//! This library provides:
//! - A single capture session driving an external ffmpeg capture-and-encode process
//! - A sandboxed store for the HLS playlist and segments it writes
//! - An HTTP gateway serving the viewer, the control page, the stream, and a JSON API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │ Capture Session │───▶│ Stream Dir   │───▶│ HTTP Gateway    │
//! │ (ffmpeg child)  │    │ (HLS files)  │    │ (axum)          │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//!          ▲                                          │
//!          └────────────── /api/start, /api/stop ─────┘
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod net;
pub mod session;
pub mod store;
pub mod types;

pub use config::{CaptureConfig, HlsConfig, ProjectorConfig, ServerConfig, SessionConfig};
pub use error::{ProjectorError, Result};
pub use gateway::GatewayState;
pub use session::{CaptureSession, StopOutcome};
pub use store::SegmentStore;
pub use types::{SessionSnapshot, SessionState, SourceInfo, StatusView};
