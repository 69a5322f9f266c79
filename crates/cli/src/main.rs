use async_trait::async_trait;
use clap::{Parser, Subcommand};
use lib::channels::{DispatchError, ReplySender};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "careline")]
#[command(about = "Careline LINE healthcare chatbot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: CARELINE_CONFIG_PATH or ~/.careline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Serve the webhook gateway (health, /webhook, /test) until Ctrl+C.
    Serve {
        /// Config file path (default: CARELINE_CONFIG_PATH or ~/.careline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8787)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run one message through the pipeline locally and print the reply that would be sent.
    Ask {
        /// Config file path (default: CARELINE_CONFIG_PATH or ~/.careline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Message text, e.g. "What is HIV?"
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("careline {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, message }) => {
            if let Err(e) = run_ask(config, message).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

/// Reply sink for `ask`: nothing is sent to LINE.
struct Discard;

#[async_trait]
impl ReplySender for Discard {
    async fn send_reply(&self, _reply_token: &str, _text: &str) -> Result<(), DispatchError> {
        Ok(())
    }
}

async fn run_ask(config_path: Option<std::path::PathBuf>, message: String) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let dispatcher = lib::dispatch::Dispatcher::new(
        Arc::new(lib::content::BundledContent::new()),
        lib::llm::build_generator(&config.ai),
        Arc::new(Discard),
        &config.timeouts,
    );
    let deadline = lib::dispatch::Deadline::after(config.timeouts.request());
    let rid = uuid::Uuid::new_v4().to_string();
    let reply = dispatcher.answer(&rid, &message, deadline).await;
    log::info!(
        "[{}] topic={} language={} source={}",
        rid,
        reply.topic,
        reply.language,
        reply.source
    );
    println!("{}", reply.text);
    Ok(())
}
