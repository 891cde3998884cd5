use anyhow::Result;
use botfleet::config::FleetConfig;
use botfleet::coordinator::FleetCoordinator;
use botfleet::record::BotStatus;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "botfleet", version, about = "Fleet coordinator for trading bot worker processes")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "fleet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every worker with a readable record
    List,

    /// List workers live in the given status
    Active {
        #[arg(default_value = "active")]
        status: String,
    },

    /// List live workers holding an open position
    Open {
        #[arg(default_value = "active")]
        status: String,
    },

    /// List workers claiming the given status but past their liveness window
    Hung {
        #[arg(default_value = "active")]
        status: String,
    },

    /// Start a worker process for a market pair
    Start {
        /// Market pair identifier (e.g. BTC-USD)
        pair: String,

        /// Exchange the worker should target
        #[arg(short, long, default_value = "")]
        exchange: String,

        /// Extra arguments appended verbatim to the worker invocation
        #[arg(short, long, default_value = "")]
        overrides: String,

        /// Start method tag passed to the worker
        #[arg(long, default_value = "cli")]
        start_method: String,
    },

    /// Ask a running worker to wind down
    Stop {
        /// Market pair identifier
        pair: String,

        /// Status value to write into the worker's control section
        #[arg(short, long, default_value = "exit")]
        status: String,

        /// Only stop when the worker reports no open position
        #[arg(long)]
        only_if_flat: bool,
    },

    /// Check whether a worker record exists
    Running { pair: String },

    /// Show which exchange a worker targets
    Exchange { pair: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FleetConfig::load_from(&cli.config)?;
    let _log_guard = init_logging(&config.logs_dir)?;
    let coordinator = FleetCoordinator::new(config);

    match cli.command {
        Commands::List => print_pairs(&coordinator.all().await),
        Commands::Active { status } => {
            print_pairs(&coordinator.active(&BotStatus::from(status)).await)
        }
        Commands::Open { status } => print_pairs(
            &coordinator
                .active_with_open_position(&BotStatus::from(status))
                .await,
        ),
        Commands::Hung { status } => {
            print_pairs(&coordinator.hung(&BotStatus::from(status)).await)
        }
        Commands::Start {
            pair,
            exchange,
            overrides,
            start_method,
        } => {
            if coordinator.start(&pair, &exchange, &overrides, &start_method) {
                println!("\x1b[32m✓ Worker '{}' started\x1b[0m", pair);
            } else {
                println!("\x1b[33m⚠ Worker '{}' not started\x1b[0m", pair);
            }
        }
        Commands::Stop {
            pair,
            status,
            only_if_flat,
        } => {
            if coordinator
                .stop(&pair, &BotStatus::from(status), only_if_flat)
                .await
            {
                println!("\x1b[32m✓ Stop requested for '{}'\x1b[0m", pair);
            } else {
                println!("\x1b[33m⚠ Worker '{}' not stopped\x1b[0m", pair);
            }
        }
        Commands::Running { pair } => {
            if coordinator.is_running(&pair) {
                println!("\x1b[32m● '{}' is running\x1b[0m", pair);
            } else {
                println!("\x1b[90m○ '{}' is not running\x1b[0m", pair);
            }
        }
        Commands::Exchange { pair } => match coordinator.exchange_of(&pair).await {
            Some(exchange) => println!("{exchange}"),
            None => println!("\x1b[33m⚠ No exchange known for '{}'\x1b[0m", pair),
        },
    }

    Ok(())
}

fn print_pairs(pairs: &[String]) {
    if pairs.is_empty() {
        println!("\x1b[90m(no workers)\x1b[0m");
        return;
    }
    for pair in pairs {
        println!("{pair}");
    }
}

/// One-time logging init: console plus a daily-rolling file under the
/// configured log directory.
fn init_logging(logs_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;
    let file = tracing_appender::rolling::daily(logs_dir, "botfleet.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,botfleet=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}
