use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "uast-cli")]
#[command(about = "Client for a running UAST proxy", long_about = None)]
struct Cli {
    #[arg(short, long, env = "UAST_PROXY_URL", default_value = "http://localhost:8095")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the engine version
    Version,
    /// List languages the engine supports
    Languages,
    /// Parse a source file and print its UAST
    Parse {
        /// File to parse
        file: PathBuf,
        /// Language hint (detected from the filename when omitted)
        #[arg(short, long)]
        language: Option<String>,
        /// native, annotated or semantic
        #[arg(short, long)]
        mode: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Version => client.get(format!("{}/version", base)).send().await?,
        Commands::Languages => client.get(format!("{}/languages", base)).send().await?,
        Commands::Parse { file, language, mode } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let body = json!({
                "content": content,
                "filename": filename,
                "language": language,
                "mode": mode,
            });
            client.post(format!("{}/parse", base)).json(&body).send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text.trim_end());
        }
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
