//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::json;
use tokio::net::TcpListener;

use uast_proxy::engine::{
    Connector, DriverManifest, EngineConnection, EngineError, EngineResult, EngineVersion,
    ParseQuery, ParsedTree,
};
use uast_proxy::{HttpServer, ProxyConfig, Shutdown};

/// Content that makes the fake engine report a syntax error.
pub const SYNTAX_ERROR: &str = "@@syntax-error@@";
/// Content that makes the fake engine fail internally.
pub const CRASH: &str = "@@crash@@";

/// What the fake engine has been asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: usize,
    pub versions: usize,
    pub languages: usize,
    pub parses: Vec<ParseQuery>,
}

/// In-process engine standing in for the gRPC service.
#[derive(Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Calls>>,
    down: bool,
    build: Option<i64>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            build: Some(1_546_398_245),
            ..Default::default()
        }
    }

    /// An engine whose every connection attempt fails.
    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::new()
        }
    }

    /// An engine reporting no build time.
    pub fn without_build() -> Self {
        Self {
            build: None,
            ..Self::new()
        }
    }

    pub fn with_calls<R>(&self, f: impl FnOnce(&Calls) -> R) -> R {
        f(&self.calls.lock().unwrap())
    }
}

#[async_trait]
impl Connector for FakeEngine {
    async fn connect(&self) -> EngineResult<Box<dyn EngineConnection>> {
        if self.down {
            return Err(EngineError::Connect {
                address: "http://127.0.0.1:9432".into(),
                message: "transport error: connection refused".into(),
            });
        }
        self.calls.lock().unwrap().connects += 1;
        Ok(Box::new(self.clone()))
    }
}

fn detect_language(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("py") => "python",
        Some("go") => "go",
        Some("js") => "javascript",
        _ => "",
    }
}

#[async_trait]
impl EngineConnection for FakeEngine {
    async fn version(&mut self) -> EngineResult<EngineVersion> {
        self.calls.lock().unwrap().versions += 1;
        Ok(EngineVersion {
            version: "v2.16.1".into(),
            build: self.build.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    async fn supported_languages(&mut self) -> EngineResult<Vec<DriverManifest>> {
        self.calls.lock().unwrap().languages += 1;
        Ok(vec![
            DriverManifest {
                name: "Python".into(),
                language: "python".into(),
                version: "v2.9.0".into(),
                status: "beta".into(),
                features: vec!["ast".into(), "uast".into(), "roles".into()],
                aliases: vec![],
            },
            DriverManifest {
                name: "Go".into(),
                language: "go".into(),
                version: "v2.7.1".into(),
                status: "beta".into(),
                features: vec!["ast".into(), "uast".into()],
                aliases: vec!["golang".into()],
            },
        ])
    }

    async fn parse(&mut self, query: ParseQuery) -> EngineResult<ParsedTree> {
        self.calls.lock().unwrap().parses.push(query.clone());

        if query.content.contains(SYNTAX_ERROR) {
            return Err(EngineError::Syntax(vec!["unexpected token at line 1".into()]));
        }
        if query.content.contains(CRASH) {
            return Err(EngineError::Rpc {
                call: "parse",
                code: tonic::Code::Internal,
                message: "driver exited unexpectedly".into(),
            });
        }

        let language = if query.language.is_empty() {
            detect_language(&query.filename).to_string()
        } else {
            query.language.clone()
        };

        Ok(ParsedTree {
            uast: json!({
                "@type": "File",
                "mode": query.mode.as_str(),
                "content": query.content,
            }),
            language,
        })
    }
}

/// A proxy serving on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy in front of `engine`.
pub async fn start_proxy(engine: FakeEngine) -> TestProxy {
    start_proxy_with(ProxyConfig::default(), engine).await
}

/// Start a proxy with a custom configuration in front of `engine`.
pub async fn start_proxy_with(config: ProxyConfig, engine: FakeEngine) -> TestProxy {
    serve(HttpServer::with_connector(config, Arc::new(engine))).await
}

/// Start an already built server on an ephemeral port.
pub async fn serve(server: HttpServer) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestProxy {
        addr,
        shutdown,
        client,
    }
}
