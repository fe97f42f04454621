use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use logship::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use logship::Supervisor;
use std::path::PathBuf;

/// Command-line arguments for the log shipping agent
#[derive(Parser)]
#[command(
    name = "logship",
    about = "Host log shipping agent - forwards error output of services and log files",
    long_about = "Discovers running containers and service units, follows their logs and the \
                  configured log files, and forwards chunks that look like errors to a remote \
                  analyzer endpoint."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (YAML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (debug level)")]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        let path = self.config_path();
        if path.exists() && !path.is_file() {
            return Err(format!(
                "Configuration path is not a file: {}",
                path.display()
            ));
        }

        if let Some(extension) = path.extension() {
            if extension != "yaml" && extension != "yml" {
                warn!(
                    "Configuration file does not have a .yaml extension: {}",
                    path.display()
                );
            }
        }

        Ok(())
    }

    /// Configured path, or the system default
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config_path = cli.config_path();
    info!("Loading configuration from: {}", config_path.display());
    let config = AgentConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let supervisor = Supervisor::new(config).context("Failed to initialize agent")?;

    let shutdown = supervisor.shutdown_token();
    ctrlc::set_handler(move || {
        info!("Received termination signal, shutting down gracefully...");
        shutdown.cancel();
    })
    .context("Error setting signal handler for graceful shutdown")?;

    info!("Log shipping agent starting. Press Ctrl+C to stop.");
    supervisor.run().await;
    info!("Agent shutdown complete");

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
