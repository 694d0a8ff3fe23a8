//! Route handlers.
//!
//! Each handler checks the method itself, opens one engine connection, makes
//! one call and maps the outcome. The connection is dropped on every path.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineConnection, EngineResult, ParseQuery, UastMode};
use crate::http::response::{json_document, json_response, raw_json, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Inbound `/parse` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseRequest {
    pub language: Option<String>,
    pub filename: Option<String>,
    pub content: String,
    pub filter: Option<String>,
    pub mode: Option<String>,
}

/// Successful `/parse` body.
#[derive(Debug, Serialize)]
pub struct ParseResponse<'a> {
    pub uast: &'a serde_json::Value,
    pub language: &'a str,
}

/// `/version` body.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub build: String,
}

fn require_method(method: &Method, expected: Method) -> Result<(), ApiError> {
    if *method == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

/// Record an engine call's outcome in logs and metrics.
fn observe<T>(call: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    match &result {
        Ok(_) => metrics::record_engine_call(call, "ok"),
        Err(e) if e.is_syntax() => {
            tracing::debug!(call, error = %e, "Engine rejected source");
            metrics::record_engine_call(call, "syntax_error");
        }
        Err(e) => {
            tracing::warn!(call, error = %e, "Engine call failed");
            metrics::record_engine_call(call, "error");
        }
    }
    result
}

async fn connect(state: &AppState) -> Result<Box<dyn EngineConnection>, ApiError> {
    Ok(observe("connect", state.engine.connect().await)?)
}

/// `GET /version`
pub async fn version(State(state): State<AppState>, method: Method) -> Result<Response, ApiError> {
    require_method(&method, Method::GET)?;

    let mut conn = connect(&state).await?;
    let version = observe("version", conn.version().await)?;

    Ok(json_response(
        StatusCode::OK,
        &VersionResponse {
            build: version.build_rfc3339(),
            version: version.version,
        },
    ))
}

/// `GET /languages`
pub async fn languages(State(state): State<AppState>, method: Method) -> Result<Response, ApiError> {
    require_method(&method, Method::GET)?;

    let mut conn = connect(&state).await?;
    let manifests = observe("supported_languages", conn.supported_languages().await)?;

    Ok(json_response(StatusCode::OK, &manifests))
}

/// `POST /parse`
pub async fn parse(State(state): State<AppState>, request: Request<Body>) -> Result<Response, ApiError> {
    require_method(request.method(), Method::POST)?;

    let limit = state.max_body_bytes.unwrap_or(usize::MAX);
    let body = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let req: ParseRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mode = UastMode::resolve(req.mode.as_deref().unwrap_or_default())?;

    let mut conn = connect(&state).await?;
    let query = ParseQuery {
        language: req.language.unwrap_or_default(),
        filename: req.filename.unwrap_or_default(),
        content: req.content,
        mode,
    };
    tracing::debug!(
        language = %query.language,
        filename = %query.filename,
        mode = %mode,
        bytes = query.content.len(),
        "Forwarding parse request"
    );
    let tree = observe("parse", conn.parse(query).await)?;
    drop(conn);

    let success = ParseResponse {
        uast: &tree.uast,
        language: &tree.language,
    };

    if req.filter.as_deref().is_some_and(|f| !f.is_empty()) {
        // Filtering is unsupported: the 501 error document is written and the
        // parse result still follows it in the same body.
        tracing::warn!("Filter requested but not implemented");
        let mut body = ApiError::NotImplemented("filter").body();
        body.extend(json_document(&success).unwrap_or_default());
        return Ok(raw_json(StatusCode::NOT_IMPLEMENTED, body));
    }

    Ok(json_response(StatusCode::OK, &success))
}
