use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};

use gemini_voice_agent::{AgentConfig, Worker, WorkerOptions, bootstrap, check};

/// Gemini voice agent - LiveKit worker bridging rooms to the Gemini Live API
#[derive(Parser, Debug)]
#[command(name = "gemini-voice-agent")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify configuration and client setup without joining a room
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    if let Some(Commands::Check) = cli.command {
        check::run(cli.config.as_ref());
        return Ok(());
    }

    // Load configuration from file or environment
    let config = if let Some(ref config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        AgentConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        AgentConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };
    let config = Arc::new(config);

    let entrypoint_config = config.clone();
    let options = WorkerOptions {
        agent_name: config.agent_name.clone(),
        entrypoint: Arc::new(move |ctx| {
            let config = entrypoint_config.clone();
            Box::pin(bootstrap::run_job(ctx, config))
        }),
        request_handler: Arc::new(|request| Box::pin(bootstrap::accept_all_jobs(request))),
    };

    println!("Starting agent worker for {}", config.livekit_url);
    let worker = Worker::new(config, options);
    worker.run().await.map_err(|e| anyhow!(e.to_string()))?;

    Ok(())
}
