//! Parsing engine integration subsystem.
//!
//! # Data Flow
//! ```text
//! EngineConfig (address, optional timeouts)
//!     → client.rs (GrpcConnector, built once at start)
//!     → per request: connect() → one unary call → drop
//!     → protocol.rs (wire messages)
//!     → nodes.rs (graph-encoded tree → serde_json::Value)
//! ```
//!
//! # Design Decisions
//! - `Connector` / `EngineConnection` traits are the seam the HTTP layer depends on
//! - No retries: every engine failure is terminal for its request
//! - Syntax errors are a distinct error kind from transport failures

pub mod client;
pub mod nodes;
pub mod protocol;
pub mod types;

pub use client::{endpoint_uri, Connector, EngineConnection, GrpcConnector};
pub use types::{
    DriverManifest, EngineError, EngineResult, EngineVersion, InvalidMode, ParseQuery, ParsedTree,
    UastMode,
};
