//! Response building and error mapping.
//!
//! # Responsibilities
//! - Serialize bodies as newline-terminated JSON documents
//! - Map request and engine errors to HTTP status codes
//!
//! # Status Mapping
//! ```text
//! bad body / bad JSON / bad mode   → 400 {"error": ...}
//! engine syntax error              → 400 {"error": "error parsing UAST: ..."}
//! engine unreachable / RPC failure → 500 {"error": ...}
//! filter requested                 → 501 {"error": ...}
//! wrong method                     → 405, empty body
//! ```

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::engine::{EngineError, InvalidMode};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unreadable body or invalid JSON.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidMode(#[from] InvalidMode),

    /// The engine rejected the source.
    #[error("error parsing UAST: {0}")]
    Syntax(EngineError),

    /// The engine could not be reached or failed.
    #[error("{0}")]
    Engine(EngineError),

    #[error("{0} is not yet implemented")]
    NotImplemented(&'static str),

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        if err.is_syntax() {
            ApiError::Syntax(err)
        } else {
            ApiError::Engine(err)
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidMode(_) | ApiError::Syntax(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// The JSON document for this error.
    pub fn body(&self) -> Vec<u8> {
        json_document(&ErrorBody {
            error: &self.to_string(),
        })
        .unwrap_or_default()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
            _ => raw_json(self.status(), self.body()),
        }
    }
}

/// Serialize `value` as one JSON document followed by a newline.
pub fn json_document<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = serde_json::to_vec(value)?;
    body.push(b'\n');
    Ok(body)
}

/// Respond with pre-encoded JSON bytes.
pub fn raw_json(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Respond with `value` as JSON, or a 500 if it cannot be encoded.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match json_document(value) {
        Ok(body) => raw_json(status, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response body");
            raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json_document(&ErrorBody {
                    error: &e.to_string(),
                })
                .unwrap_or_default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(EngineError::Syntax(vec!["bad".into()])).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(EngineError::Decode("bad".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(EngineError::Connect {
                address: "http://127.0.0.1:1".into(),
                message: "refused".into(),
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NotImplemented("filter").status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_syntax_message() {
        let err = ApiError::from(EngineError::Syntax(vec!["unexpected EOF".into()]));
        assert_eq!(err.to_string(), "error parsing UAST: syntax error: unexpected EOF");
    }

    #[test]
    fn test_error_body() {
        let body = ApiError::NotImplemented("filter").body();
        assert_eq!(body, b"{\"error\":\"filter is not yet implemented\"}\n");
    }

    #[test]
    fn test_method_not_allowed_has_empty_body() {
        let response = ApiError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
