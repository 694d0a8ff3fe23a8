//! UAST JSON proxy library.
//!
//! HTTP/JSON façade in front of a gRPC parsing engine: `/version`,
//! `/languages` and `/parse` are forwarded to the engine and the replies are
//! re-serialized as JSON.

pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

/// Application name used in logs and the CLI.
pub const APP_NAME: &str = "uast-proxy";

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build stamp injected at compile time through `UAST_PROXY_BUILD`.
pub const BUILD: &str = match option_env!("UAST_PROXY_BUILD") {
    Some(build) => build,
    None => "undefined",
};
