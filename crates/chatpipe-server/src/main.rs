use anyhow::Result;
use chatpipe_local::pipeline::PipelineConfig;
use chatpipe_local::search::{brave_api_key_from_env, serpapi_api_key_from_env};
use chatpipe_server::{build_pipeline, http, load_env_file};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "chatpipe-server")]
#[command(about = "Chatbot backend with a web-search relevance pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (POST /api/chat).
    Serve(ServeCmd),
    /// Ask a single question from the command line (prints reply + metadata JSON).
    Ask(AskCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor,
    /// Print version info.
    Version,
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Bind address.
    #[arg(long, env = "CHATPIPE_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    /// The question to ask.
    question: String,
    /// Caller key to use for the conversation memory.
    #[arg(long, default_value = "cli")]
    caller: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let pipeline = Arc::new(build_pipeline(PipelineConfig::default())?);
            http::serve(args.bind, http::AppState { pipeline }).await?;
        }
        Commands::Ask(args) => {
            let pipeline = build_pipeline(PipelineConfig::default())?;
            let outcome = pipeline.handle_message(&args.caller, &args.question).await?;
            println!("{}", outcome.reply);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "used_search": outcome.used_search,
                    "volatile": outcome.volatile,
                    "mode_label": outcome.mode_label,
                    "domain": outcome.domain,
                    "country": outcome.country,
                }))?
            );
        }
        Commands::Doctor => {
            let report = serde_json::json!({
                "openai_configured":
                    chatpipe_local::openai_compat::openai_api_key_from_env().is_some()
                        || std::env::var("CHATPIPE_OPENAI_BASE_URL").is_ok(),
                "serpapi_configured": serpapi_api_key_from_env().is_some(),
                "brave_configured": brave_api_key_from_env().is_some(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Version => {
            println!("chatpipe-server {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
