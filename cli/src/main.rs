use clap::Parser;
use idlereap_cli::{logging, Server, ServerError};
use idlereap_core::{ServerConfig, ServerConfigExt};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Echo server that closes idle connections")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Seconds of inactivity before a connection is closed
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Maximum simultaneous connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging for idlereap crates
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli).map_err(|e| e.to_string())?;
    let server = Server::bind(config).await.map_err(|e| e.to_string())?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
        .map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> Result<ServerConfig, ServerError> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from(path)?,
        None => {
            let path = ServerConfig::config_path()?;
            info!(path = %path.display(), "using default config file");
            ServerConfig::load()?
        }
    };

    if let Some(bind) = &cli.bind {
        config.bind_addr = bind.clone();
    }
    if let Some(secs) = cli.idle_timeout {
        config.idle_timeout_secs = secs;
    }
    if let Some(max) = cli.max_connections {
        config.max_connections = max;
    }

    config.validate()?;

    if cli.save_config {
        match &cli.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        info!("configuration saved");
    }
    Ok(config)
}
