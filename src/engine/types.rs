//! Engine-facing types and error definitions.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Level of tree normalization requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UastMode {
    /// Language-specific raw tree.
    Native,
    /// Native tree with semantic roles attached.
    Annotated,
    /// Fully normalized cross-language tree.
    #[default]
    Semantic,
}

impl UastMode {
    /// Map a request's `mode` string to a mode. An empty string selects the default.
    pub fn resolve(value: &str) -> Result<Self, InvalidMode> {
        match value {
            "native" => Ok(UastMode::Native),
            "annotated" => Ok(UastMode::Annotated),
            "semantic" | "" => Ok(UastMode::Semantic),
            other => Err(InvalidMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UastMode::Native => "native",
            UastMode::Annotated => "annotated",
            UastMode::Semantic => "semantic",
        }
    }
}

impl fmt::Display for UastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `mode` value outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid \"mode\" {0:?}; it must be one of \"native\", \"annotated\", \"semantic\"")]
pub struct InvalidMode(pub String);

/// Everything the engine needs to parse one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQuery {
    /// Language hint; empty lets the engine detect it.
    pub language: String,
    /// Filename hint used for extension-based detection.
    pub filename: String,
    pub content: String,
    pub mode: UastMode,
}

/// A successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTree {
    /// The decoded tree.
    pub uast: serde_json::Value,
    /// The language the engine actually used.
    pub language: String,
}

/// Engine version information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineVersion {
    pub version: String,
    /// Build time, `None` when the engine did not report one.
    pub build: Option<DateTime<Utc>>,
}

impl EngineVersion {
    /// Build time as RFC3339 (second precision, `Z` suffix), or empty when unset.
    pub fn build_rfc3339(&self) -> String {
        self.build
            .map(|b| b.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

/// One language driver the engine can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct DriverManifest {
    pub name: String,
    pub language: String,
    pub version: String,
    pub status: String,
    pub features: Vec<String>,
    pub aliases: Vec<String>,
}

/// Errors that can occur while talking to the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be reached.
    #[error("cannot connect to engine at {address}: {message}")]
    Connect { address: String, message: String },

    /// The engine answered the call with a non-OK status.
    #[error("{call} call failed: {code:?}: {message}")]
    Rpc {
        call: &'static str,
        code: tonic::Code,
        message: String,
    },

    /// The source could not be parsed.
    #[error("syntax error: {}", .0.join("; "))]
    Syntax(Vec<String>),

    /// The engine's tree could not be decoded.
    #[error("malformed UAST: {0}")]
    Decode(String),
}

impl EngineError {
    /// Whether the failure is the engine rejecting the source rather than a transport problem.
    pub fn is_syntax(&self) -> bool {
        matches!(self, EngineError::Syntax(_))
    }

    pub(crate) fn rpc(call: &'static str, status: tonic::Status) -> Self {
        EngineError::Rpc {
            call,
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Render an error together with its whole source chain.
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
