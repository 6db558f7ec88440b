pub mod commands;
pub mod export;
pub mod loader;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use cartwise_core::config::{AppConfig, LoadOptions, LoggingConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cartwise",
    about = "Customer behavior analytics and campaign planning CLI",
    long_about = "Turn raw point-of-sale transactions into customer segments, next-purchase-day predictions, product recommendations, and planned marketing campaigns.",
    after_help = "Examples:\n  cartwise run --input transactions.csv --output-dir out\n  cartwise segment --input transactions.csv\n  cartwise recommend --input transactions.csv --customer 1808"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the full pipeline and write exports, the model artifact, and a summary")]
    Run {
        #[arg(long, help = "Transactions CSV (Member_number, item, Date, name, email)")]
        input: PathBuf,
        #[arg(long, help = "Config file (defaults to cartwise.toml or config/cartwise.toml)")]
        config: Option<PathBuf>,
        #[arg(long, default_value = "out", help = "Directory for generated files")]
        output_dir: PathBuf,
        #[arg(long, help = "Override the model random seed")]
        seed: Option<u64>,
    },
    #[command(about = "Compute RFM scores and segment labels per customer")]
    Segment {
        #[arg(long, help = "Transactions CSV (Member_number, item, Date, name, email)")]
        input: PathBuf,
        #[arg(long, help = "Config file (defaults to cartwise.toml or config/cartwise.toml)")]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 10, help = "How many per-customer rows to include")]
        limit: usize,
    },
    #[command(about = "Train candidate models and predict each customer's next purchase day")]
    Predict {
        #[arg(long, help = "Transactions CSV (Member_number, item, Date, name, email)")]
        input: PathBuf,
        #[arg(long, help = "Config file (defaults to cartwise.toml or config/cartwise.toml)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Override the model random seed")]
        seed: Option<u64>,
    },
    #[command(about = "Recommend products for one customer from co-purchase affinity")]
    Recommend {
        #[arg(long, help = "Transactions CSV (Member_number, item, Date, name, email)")]
        input: PathBuf,
        #[arg(long, help = "Customer identifier (Member_number)")]
        customer: u64,
        #[arg(long, help = "List length (defaults to marketing.max_recommendations)")]
        top: Option<usize>,
        #[arg(long, help = "Config file (defaults to cartwise.toml or config/cartwise.toml)")]
        config: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config {
        #[arg(long, help = "Config file (defaults to cartwise.toml or config/cartwise.toml)")]
        config: Option<PathBuf>,
    },
}

fn init_logging(config: &LoggingConfig) {
    use cartwise_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Logging settings come from the ambient config; a broken config file
    // still gets default logging so the failure itself is visible.
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Run { input, config, output_dir, seed } => commands::run::run(
            commands::run::RunArgs { input, config_path: config, output_dir, seed },
        ),
        Command::Segment { input, config, limit } => commands::segment::run(input, config, limit),
        Command::Predict { input, config, seed } => commands::predict::run(input, config, seed),
        Command::Recommend { input, customer, top, config } => {
            commands::recommend::run(input, customer, top, config)
        }
        Command::Config { config } => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
