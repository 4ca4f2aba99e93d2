// Ladder Bot - grid ladder trading on a single spot market
// Single entry point for running the ladder and its helper commands

use std::str::FromStr;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, info, warn, Level};
use grid_ladder_bot::{Config, Side, TradingError, TradingResult, TriggerDirection};

// Load command modules from cli directory
#[path = "../cli/ladder_commands.rs"]
mod ladder_commands;
#[path = "../cli/stop_commands.rs"]
mod stop_commands;

#[derive(Parser)]
#[command(name = "ladder-bot")]
#[command(version)]
#[command(about = "Grid ladder trading bot", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config.toml and the logs directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Build the ladder and keep it populated until Ctrl-C
    Run {
        /// Reference price for the ladder (defaults to the last trade)
        #[arg(long)]
        start_price: Option<Decimal>,

        /// Log intended orders without sending them, then exit
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show balances, open orders and the ladder the bot would build now
    Status,

    /// Request a fresh deposit address for the base currency
    Address,

    /// Watch the price and send one marketable order when it crosses a trigger
    Stop {
        /// Trigger price
        #[arg(long)]
        trigger: Decimal,

        /// Order side (buy or sell)
        #[arg(long)]
        side: Side,

        /// Order size in base currency
        #[arg(long)]
        size: Decimal,

        /// Trigger direction (above or below); derived from the side if omitted
        #[arg(long)]
        direction: Option<TriggerDirection>,

        /// Log the order instead of sending it
        #[arg(short, long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging first (before the real config load so config errors are visible)
    init_logging(cli.verbose, &cli.config);

    info!("🚀 Ladder Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📁 Config: {}", cli.config);

    let result = match cli.command {
        // Init doesn't require config (it creates it)
        Commands::Init { force } => init_workspace(&cli.config, force),

        Commands::Run { start_price, dry_run } => match load_config(&cli.config) {
            Ok(config) => ladder_commands::run_ladder(config, start_price, dry_run).await,
            Err(e) => Err(e),
        },

        Commands::Status => match load_config(&cli.config) {
            Ok(config) => ladder_commands::show_status(&config).await,
            Err(e) => Err(e),
        },

        Commands::Address => match load_config(&cli.config) {
            Ok(config) => ladder_commands::show_deposit_address(&config).await,
            Err(e) => Err(e),
        },

        Commands::Stop { trigger, side, size, direction, dry_run } => match load_config(&cli.config) {
            Ok(config) => {
                stop_commands::run_stop_order(config, trigger, side, size, direction, dry_run).await
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("❌ {} error", e.category());
        for line in e.user_message().lines() {
            error!("{}", line);
        }
        if e.is_fatal() {
            error!("Stopping: the ladder was not started");
        }
        std::process::exit(1);
    }
}

/// `--verbose` wins, then `[logging] level` from the config file, then info
fn init_logging(verbose: bool, config_path: &str) {
    let level = if verbose {
        Level::DEBUG
    } else {
        Config::load_or_error(config_path)
            .ok()
            .and_then(|c| Level::from_str(&c.logging.level).ok())
            .unwrap_or(Level::INFO)
    };

    tracing_subscriber::fmt().with_max_level(level).init();
}

fn load_config(path: &str) -> TradingResult<Config> {
    Config::load_or_error(path).map_err(TradingError::from)
}

fn init_workspace(config_path: &str, force: bool) -> TradingResult<()> {
    use std::fs;

    info!("🔧 Initializing workspace...");

    fs::create_dir_all("logs")?;

    if force || !std::path::Path::new(config_path).exists() {
        let default_config = include_str!("../../config.toml.example");
        fs::write(config_path, default_config)?;
        info!("📝 Created {}", config_path);
    } else {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", config_path);
    }

    info!("✅ Workspace initialized successfully!");
    info!("💡 Next steps:");
    info!("   1. Edit {} with your API keys and ladder settings", config_path);
    info!("   2. Run: ladder-bot run --dry-run");
    info!("   3. Run: ladder-bot run");

    Ok(())
}
