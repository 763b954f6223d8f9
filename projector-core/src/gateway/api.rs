//! JSON control API

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::GatewayState;
use crate::error::ProjectorError;
use crate::session::StopOutcome;

/// Control-API error with a machine-readable reason
#[derive(Debug)]
pub struct ApiError(pub ProjectorError);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status_code(&self) -> StatusCode {
        match self.0.root() {
            ProjectorError::AlreadyRunning => StatusCode::CONFLICT,
            ProjectorError::NotFound(_) => StatusCode::NOT_FOUND,
            ProjectorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProjectorError::Enumeration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProjectorError> for ApiError {
    fn from(err: ProjectorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({
                "ok": false,
                "error": self.0.reason(),
                "message": self.0.to_string(),
                "hint": self.0.user_hint(),
            })),
        )
            .into_response()
    }
}

/// Start request body
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Source to capture; the configured default when absent or null
    pub id: Option<SourceId>,
}

/// A source id as sent by clients: a string, or a bare number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Text(String),
    Number(serde_json::Number),
}

impl StartRequest {
    /// Parse a raw request body
    ///
    /// An empty or unparseable body is an empty request. Valid JSON whose
    /// `id` is neither a string nor a number is rejected.
    pub fn from_body(body: &[u8]) -> Result<Self, ProjectorError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!("Ignoring unparseable start body: {}", e);
                return Ok(Self::default());
            }
        };
        serde_json::from_value(value)
            .map_err(|e| ProjectorError::invalid_request(format!("bad start request: {}", e)))
    }

    /// The requested source, or `default` when none was named
    pub fn source_or(self, default: &str) -> String {
        match self.id {
            Some(SourceId::Text(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Some(SourceId::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }
}

/// `GET /api/status`
pub(super) async fn status(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.session.status(state.host(), state.port))
}

/// `GET /api/sources`
pub(super) async fn sources(State(state): State<Arc<GatewayState>>) -> Result<Response, ApiError> {
    let screens = state.enumerator.list_sources().await.map_err(|e| {
        warn!("Source enumeration failed: {}", e);
        ApiError(e)
    })?;
    Ok(Json(json!({ "screens": screens })).into_response())
}

/// `POST /api/start`
///
/// A missing or unparseable body, or a null `id`, starts the default source.
pub(super) async fn start(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let source_id = StartRequest::from_body(&body)?.source_or(&state.default_source);

    state.session.start(source_id.clone()).await?;

    let host = state.host();
    info!("Sharing source {} at {}", source_id, state.viewer_url(&host));
    Ok(Json(json!({
        "ok": true,
        "message": "Started",
        "url": state.viewer_url(&host),
        "ip": host,
    }))
    .into_response())
}

/// `POST /api/stop`
///
/// Always 200: the session is idle afterwards whatever happened to the process.
pub(super) async fn stop(State(state): State<Arc<GatewayState>>) -> Response {
    let body = match state.session.stop().await {
        Ok(outcome) => json!({
            "ok": true,
            "message": match outcome {
                StopOutcome::NotRunning => "Not running",
                StopOutcome::Graceful | StopOutcome::Forced => "Stopped",
            },
            "forced": outcome == StopOutcome::Forced,
        }),
        Err(e) => json!({
            "ok": true,
            "message": "Stopped",
            "forced": true,
            "error": e.reason(),
            "detail": e.to_string(),
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError(ProjectorError::AlreadyRunning).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(ProjectorError::enumeration("no ffmpeg")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(ProjectorError::launch("denied").with_context("start")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(ProjectorError::invalid_request("id")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_start_request_source() {
        let parse = |body: &str| StartRequest::from_body(body.as_bytes()).map(|r| r.source_or("3"));

        assert_eq!(parse("").unwrap(), "3");
        assert_eq!(parse("{}").unwrap(), "3");
        assert_eq!(parse(r#"{"id":null}"#).unwrap(), "3");
        assert_eq!(parse(r#"{"id":"  "}"#).unwrap(), "3");
        assert_eq!(parse("not json").unwrap(), "3");
        assert_eq!(parse(r#"{"id":"1"}"#).unwrap(), "1");
        assert_eq!(parse(r#"{"id":1}"#).unwrap(), "1");
    }

    #[test]
    fn test_start_request_wrong_id_type() {
        for body in [r#"{"id":true}"#, r#"{"id":["1"]}"#, r#"{"id":{"n":1}}"#] {
            let err = StartRequest::from_body(body.as_bytes()).unwrap_err();
            assert_eq!(err.reason(), "invalid_request", "{}", body);
        }
    }
}
