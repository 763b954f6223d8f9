//! HTTP gateway
//!
//! One axum router serves everything the presenter and the viewers need:
//! - `GET /` - viewer page, or a waiting placeholder while nothing is shared
//! - `GET /project` - control page
//! - `GET /hls/{name}` - playlist and segments from the stream directory
//! - `GET /api/status`, `GET /api/sources`, `POST /api/start`, `POST /api/stop`
//!
//! Viewer-facing routes never surface errors: they degrade to the
//! placeholder or a bare 404 that the player retries.

mod api;
mod pages;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::{debug, info, warn};

use crate::capture::{DeviceEnumerator, FfmpegDeviceEnumerator};
use crate::config::{CaptureConfig, ProjectorConfig};
use crate::error::{ProjectorError, Result, ResultExt};
use crate::net::advertised_host;
use crate::session::CaptureSession;

pub use api::{ApiError, SourceId, StartRequest};

/// Shared state for all handlers
pub struct GatewayState {
    session: CaptureSession,
    enumerator: Arc<dyn DeviceEnumerator>,
    port: u16,
    advertise_host: Option<String>,
    static_dir: Option<PathBuf>,
    default_source: String,
}

impl GatewayState {
    /// Create gateway state around an existing session
    pub fn new(session: CaptureSession, enumerator: Arc<dyn DeviceEnumerator>, port: u16) -> Self {
        Self {
            session,
            enumerator,
            port,
            advertise_host: None,
            static_dir: None,
            default_source: CaptureConfig::default().default_source,
        }
    }

    /// Build the production gateway: ffmpeg session and ffmpeg enumerator
    pub fn from_config(config: &ProjectorConfig) -> Self {
        Self {
            session: CaptureSession::from_config(config),
            enumerator: Arc::new(FfmpegDeviceEnumerator::new(&config.capture)),
            port: config.server.port,
            advertise_host: config.server.advertise_host.clone(),
            static_dir: config.server.static_dir.clone(),
            default_source: config.capture.default_source.clone(),
        }
    }

    /// Advertise a fixed host instead of detecting one
    pub fn with_advertise_host(mut self, host: impl Into<String>) -> Self {
        self.advertise_host = Some(host.into());
        self
    }

    /// Serve page overrides from `dir`
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Source used when a start request names none
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    /// The capture session behind this gateway
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    fn host(&self) -> String {
        advertised_host(self.advertise_host.as_deref())
    }

    fn viewer_url(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.port)
    }
}

/// Build the router
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(pages::viewer))
        .route("/index.html", get(pages::viewer))
        .route("/project", get(pages::control))
        .route("/hls/:name", get(stream_file))
        .route("/api/status", get(api::status))
        .route("/api/sources", get(api::sources))
        .route("/api/start", post(api::start))
        .route("/api/stop", post(api::stop))
        .with_state(Arc::new(state))
}

/// Serve until `shutdown` resolves, then stop any running capture
pub async fn serve(
    state: GatewayState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let session = state.session.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ProjectorError::from)
        .context(format!("Failed to bind {}", addr))?;
    info!("Projector listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    session.shutdown().await;
    served.map_err(ProjectorError::from)
}

/// `GET /hls/{name}`
async fn stream_file(State(state): State<Arc<GatewayState>>, Path(name): Path<String>) -> Response {
    if !state.session.is_running() {
        debug!("Stream file {} requested while not running", name);
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.session.store().read(&name).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, file.kind.content_type()),
                (header::CACHE_CONTROL, file.kind.cache_control()),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            file.bytes,
        )
            .into_response(),
        Err(ProjectorError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("Failed to read stream file {}: {}", name, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
