//! UAST JSON proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http::server ──▶ http::handlers ──▶ engine::client ──▶ Parsing Engine
//!                                      │                  │             (gRPC)
//!   Client ◀── JSON / status ◀─────────┘◀── engine::nodes ┘
//!
//!   Cross-cutting: config · observability · lifecycle
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use uast_proxy::config::{read_config, validate_config, ConfigError, LogFormat, ProxyConfig};
use uast_proxy::lifecycle::{signals, Shutdown};
use uast_proxy::observability::{logging, metrics};
use uast_proxy::{HttpServer, APP_NAME, BUILD, VERSION};

#[derive(Parser)]
#[command(name = "uast-proxy")]
#[command(about = "HTTP/JSON proxy in front of a UAST parsing engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start serving the HTTP API
    Serve(ServeArgs),
    /// Print version information
    Version,
}

/// Flags override the config file, which overrides built-in defaults.
#[derive(Args, Debug)]
struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long, env = "UAST_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the HTTP server [default: 0.0.0.0]
    #[arg(long, env = "UAST_PROXY_HOST")]
    host: Option<String>,

    /// Port to bind the HTTP server [default: 8095]
    #[arg(long, env = "UAST_PROXY_PORT")]
    port: Option<u16>,

    /// Address where the parsing engine is listening [default: 127.0.0.1:9432]
    #[arg(long, env = "UAST_PROXY_ENGINE_URL")]
    engine: Option<String>,

    /// Log level or filter directives [default: info]
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format, text or json [default: text]
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Bind address of the Prometheus metrics endpoint (disabled when unset)
    #[arg(long, env = "UAST_PROXY_METRICS_ADDRESS")]
    metrics_address: Option<String>,
}

impl ServeArgs {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(engine) = self.engine {
            config.engine.address = engine;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{} {} (build {})", APP_NAME, VERSION, BUILD);
            ExitCode::SUCCESS
        }
        Commands::Serve(args) => match serve(args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}: {}", APP_NAME, e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;

    run(config)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Server terminated"))
}

/// Start metrics, the engine client and the listener, then serve until shutdown.
async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(app = APP_NAME, version = VERSION, build = BUILD, "Starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        engine = %config.engine.address,
        max_body_bytes = ?config.limits.max_body_bytes,
        max_uast_depth = config.engine.max_uast_depth,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        let addr: SocketAddr = addr.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone())?;

    let listener = TcpListener::bind(config.listener.bind_address())
        .await
        .map_err(|e| format!("error creating http listener: {}", e))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(|e| format!("error serving http: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
