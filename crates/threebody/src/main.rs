use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use threebody::models::ThreeBodyConfig;
use threebody::runner::{Daemon, LoopConfig};
use threebody::state::StateStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "threebody",
    about = "Three-Body Portfolio - autonomous trading committee agent"
)]
struct Cli {
    /// Path to configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "config/threebody.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run decision cycles until interrupted
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Print the last persisted dashboard record
    Status,
}

fn init_tracing(json: bool) {
    // Respects RUST_LOG, info otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &str) -> Result<ThreeBodyConfig> {
    let mut config = if Path::new(path).exists() {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {path}"))?;
        toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))?
    } else {
        tracing::info!(path, "No config file, using defaults");
        ThreeBodyConfig::default()
    };

    config
        .apply_process_env()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();
    init_tracing(cli.log_json);

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Command::Run { once: false }) {
        Command::Status => print_status(&config),
        Command::Run { once } => run(config, once).await,
    }
}

async fn run(config: ThreeBodyConfig, once: bool) -> Result<()> {
    let controller =
        threebody::build_controller(&config).context("Failed to build cycle controller")?;
    let daemon = Daemon::new(controller, LoopConfig::from_agent(&config.agent));

    if once {
        let report = daemon
            .run_once()
            .await
            .map_err(|e| anyhow::anyhow!("Cycle error: {e}"))?;
        let outcome = report
            .outcome
            .with_context(|| format!("Cycle {} ended in {}", report.cycle_id, report.state))?;
        println!("{}", serde_json::to_string_pretty(&outcome.to_record())?);
        return Ok(());
    }

    let cancel = daemon.cancel_token();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal, stopping after the current cycle");
        cancel.cancel();
    });

    daemon.run().await;
    Ok(())
}

fn print_status(config: &ThreeBodyConfig) -> Result<()> {
    let store = threebody::build_state_store(&config.state)
        .with_context(|| format!("Failed to open state store: {}", config.state.path))?;

    match store.load().context("Failed to read dashboard state")? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "timestamp": "Waiting...",
                "ticker": config.agent.ticker,
                "decision": "INIT",
                "agent": "System",
                "reason": "Waiting for first cycle...",
                "tx_hash": threebody::models::NO_EXECUTION_REFERENCE,
            }))?
        ),
    }
    Ok(())
}
