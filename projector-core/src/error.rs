//! Error types for Projector

use thiserror::Error;

/// Result type alias using ProjectorError
pub type Result<T> = std::result::Result<T, ProjectorError>;

/// Main error type for Projector operations
#[derive(Debug, Error)]
pub enum ProjectorError {
    /// Start requested while a session is not idle
    #[error("Capture session already running")]
    AlreadyRunning,

    /// Requested stream file is missing or outside the stream directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Platform source query failed
    #[error("Source enumeration failed: {0}")]
    Enumeration(String),

    /// Capture process could not be spawned or died during startup
    #[error("Failed to launch capture process: {0}")]
    ProcessLaunch(String),

    /// Capture process could not be terminated
    #[error("Capture process unresponsive: {0}")]
    ProcessUnresponsive(String),

    /// Malformed control request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProjectorError>,
    },
}

impl ProjectorError {
    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a process launch error
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::ProcessLaunch(msg.into())
    }

    /// Create an unresponsive-process error
    pub fn unresponsive(msg: impl Into<String>) -> Self {
        Self::ProcessUnresponsive(msg.into())
    }

    /// Create an invalid-request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &ProjectorError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Machine-readable reason, used in HTTP error bodies
    pub fn reason(&self) -> &'static str {
        match self.root() {
            Self::AlreadyRunning => "already_running",
            Self::NotFound(_) => "not_found",
            Self::Enumeration(_) => "enumeration_failed",
            Self::ProcessLaunch(_) => "process_launch_failed",
            Self::ProcessUnresponsive(_) => "process_unresponsive",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
            Self::Io(_) | Self::WithContext { .. } => "io",
        }
    }

    /// A hint the presenter can act on, if there is one
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::AlreadyRunning => Some("Stop the current share first (projector control page → Stop)"),
            Self::Enumeration(_) => {
                Some("Make sure ffmpeg is installed and on PATH, or set capture.ffmpeg in config.toml")
            }
            Self::ProcessLaunch(_) => Some(
                "Grant Screen Recording permission to your terminal and check that ffmpeg is installed",
            ),
            Self::ProcessUnresponsive(_) => {
                Some("The encoder ignored termination; check for a stray ffmpeg process")
            }
            Self::Config(_) => Some("Check ~/.config/projector/config.toml"),
            _ => None,
        }
    }

    /// Whether the presenter can fix this without touching code
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::AlreadyRunning | Self::Enumeration(_) | Self::ProcessLaunch(_) | Self::Config(_)
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<toml::de::Error> for ProjectorError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}
