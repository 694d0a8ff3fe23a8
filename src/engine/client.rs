//! Engine RPC client.
//!
//! # Responsibilities
//! - Resolve the engine address once, at start
//! - Open one gRPC channel per proxied request
//! - Issue the version, supported-languages and parse calls
//! - Separate syntax errors from transport and RPC failures

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::{InvalidUri, PathAndQuery};
use tonic::transport::{Channel, Endpoint, Uri};

use crate::config::EngineConfig;
use crate::engine::nodes;
use crate::engine::protocol;
use crate::engine::types::{
    describe, DriverManifest, EngineError, EngineResult, EngineVersion, ParseQuery, ParsedTree,
};

/// Opens connections to the engine.
///
/// Built once from configuration and shared by all requests.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection for a single request.
    async fn connect(&self) -> EngineResult<Box<dyn EngineConnection>>;
}

/// One open connection to the engine. Dropping it releases the connection.
#[async_trait]
pub trait EngineConnection: Send {
    async fn version(&mut self) -> EngineResult<EngineVersion>;

    async fn supported_languages(&mut self) -> EngineResult<Vec<DriverManifest>>;

    /// Parse a file. Rejected source comes back as [`EngineError::Syntax`].
    async fn parse(&mut self, query: ParseQuery) -> EngineResult<ParsedTree>;
}

/// Turn `host:port` or a full URI into the URI the channel dials.
pub fn endpoint_uri(address: &str) -> Result<Uri, InvalidUri> {
    let address = address.trim();
    if address.contains("://") {
        Uri::from_str(address)
    } else {
        Uri::from_str(&format!("http://{}", address))
    }
}

/// Connector dialing the engine over gRPC.
#[derive(Clone)]
pub struct GrpcConnector {
    endpoint: Endpoint,
    address: String,
    max_depth: usize,
}

impl GrpcConnector {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let uri = endpoint_uri(&config.address).map_err(|e| EngineError::Connect {
            address: config.address.clone(),
            message: e.to_string(),
        })?;
        let address = uri.to_string();

        let mut endpoint = Endpoint::from(uri);
        if let Some(secs) = config.connect_timeout_secs {
            endpoint = endpoint.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.call_timeout_secs {
            endpoint = endpoint.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            endpoint,
            address,
            max_depth: config.max_uast_depth,
        })
    }

    /// The resolved engine URI.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    async fn connect(&self) -> EngineResult<Box<dyn EngineConnection>> {
        let channel = self
            .endpoint
            .connect()
            .await
            .map_err(|e| EngineError::Connect {
                address: self.address.clone(),
                message: describe(&e),
            })?;

        tracing::debug!(engine = %self.address, "Engine connection established");

        Ok(Box::new(GrpcConnection {
            grpc: Grpc::new(channel),
            address: self.address.clone(),
            max_depth: self.max_depth,
        }))
    }
}

/// A live gRPC channel to the engine.
pub struct GrpcConnection {
    grpc: Grpc<Channel>,
    address: String,
    max_depth: usize,
}

impl GrpcConnection {
    async fn unary<Req, Resp>(
        &mut self,
        call: &'static str,
        path: &'static str,
        message: Req,
    ) -> EngineResult<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.grpc.ready().await.map_err(|e| EngineError::Connect {
            address: self.address.clone(),
            message: describe(&e),
        })?;

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = self
            .grpc
            .unary(tonic::Request::new(message), PathAndQuery::from_static(path), codec)
            .await
            .map_err(|status| EngineError::rpc(call, status))?;

        Ok(response.into_inner())
    }
}

#[async_trait]
impl EngineConnection for GrpcConnection {
    async fn version(&mut self) -> EngineResult<EngineVersion> {
        let response: protocol::VersionResponse = self
            .unary("version", protocol::SERVER_VERSION_PATH, protocol::VersionRequest {})
            .await?;

        let version = response.version.unwrap_or_default();
        let build = version
            .build
            .filter(|ts| ts.seconds != 0 || ts.nanos != 0)
            .and_then(|ts| DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?));

        Ok(EngineVersion {
            version: version.version,
            build,
        })
    }

    async fn supported_languages(&mut self) -> EngineResult<Vec<DriverManifest>> {
        let response: protocol::SupportedLanguagesResponse = self
            .unary(
                "supported languages",
                protocol::SUPPORTED_LANGUAGES_PATH,
                protocol::SupportedLanguagesRequest {},
            )
            .await?;

        Ok(response.languages.into_iter().map(DriverManifest::from).collect())
    }

    async fn parse(&mut self, query: ParseQuery) -> EngineResult<ParsedTree> {
        let request = protocol::ParseRequest {
            content: query.content,
            mode: protocol::Mode::from(query.mode) as i32,
            language: query.language,
            filename: query.filename,
        };
        let response: protocol::ParseResponse =
            self.unary("parse", protocol::PARSE_PATH, request).await?;

        if !response.errors.is_empty() {
            return Err(EngineError::Syntax(
                response.errors.into_iter().map(|e| e.text).collect(),
            ));
        }

        Ok(ParsedTree {
            uast: nodes::decode(&response.uast, self.max_depth)?,
            language: response.language,
        })
    }
}
