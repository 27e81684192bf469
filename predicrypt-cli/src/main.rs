//! # PrediCrypt CLI
//!
//! Offline companion for PrediCrypt prediction markets: unit conversion,
//! pool odds, transaction previews and market status.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use predicrypt_core::{
    config::LoggingConfig,
    units::{format_display, pool_percentages, to_display_unit, to_smallest_unit, MIST_PER_SUI},
    utils::{format_countdown, format_timestamp, now_millis},
    ClientConfig, Market, MarketView, TransactionBuilder, TransactionDescriptor,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "predicrypt")]
#[command(about = "Binary prediction markets on a Move smart-contract ledger")]
#[command(version)]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Contract package id, overrides the configuration file
    #[arg(short, long, global = true)]
    package: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Sui,
    Mist,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Yes,
    No,
}

impl Side {
    fn as_bool(self) -> bool {
        matches!(self, Side::Yes)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between SUI and MIST
    Convert {
        /// Amount to convert
        amount: f64,
        /// Unit of the amount
        #[arg(value_enum)]
        unit: Unit,
    },
    /// Show pool shares for the given pools (in MIST)
    Odds {
        #[arg(long)]
        yes: u64,
        #[arg(long)]
        no: u64,
    },
    /// Build a transaction descriptor and print it as JSON
    Build {
        #[command(subcommand)]
        call: BuildCall,
    },
    /// Show the status of a market read from a JSON file
    Status {
        /// Market JSON file
        market: PathBuf,
        /// Address viewing the market, defaults to the creator
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Show the time left until a deadline
    Countdown {
        /// Deadline in Unix milliseconds
        #[arg(long)]
        end: u64,
    },
}

#[derive(Subcommand)]
enum BuildCall {
    /// create_market
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        /// End date, e.g. 2030-01-01T12:00 (local time)
        #[arg(short, long)]
        end_date: String,
    },
    /// place_bet
    Bet {
        #[arg(short, long)]
        market: String,
        #[arg(long, value_enum)]
        prediction: Side,
        /// Stake in SUI
        #[arg(short, long)]
        amount: f64,
    },
    /// resolve_market
    Resolve {
        #[arg(short, long)]
        market: String,
        /// Winning side; asked interactively when omitted
        #[arg(long, value_enum)]
        outcome: Option<Side>,
    },
    /// claim_winnings
    Claim {
        #[arg(short, long)]
        market: String,
        #[arg(short, long)]
        bet: String,
    },
}

fn load_config(path: Option<&PathBuf>, package: Option<&str>) -> Result<Option<ClientConfig>> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Some(
                ClientConfig::from_toml_str(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?,
            )
        }
        None => None,
    };
    if let Some(package) = package {
        config = Some(match config {
            Some(mut config) => {
                config.package_id = TransactionBuilder::new(package)?.package_id().to_string();
                config
            }
            None => ClientConfig::new(package)?,
        });
    }
    Ok(config)
}

/// Both sides of a conversion, rendered with their units
fn convert(amount: f64, unit: Unit) -> Result<(String, String)> {
    if !amount.is_finite() || amount < 0.0 {
        bail!("Amount must be a finite, non-negative number, got {amount}");
    }
    match unit {
        Unit::Sui => {
            if amount * MIST_PER_SUI as f64 > u64::MAX as f64 {
                bail!("{amount} SUI does not fit in a MIST amount");
            }
            Ok((format!("{amount} SUI"), format!("{} MIST", to_smallest_unit(amount))))
        }
        Unit::Mist => {
            if amount.fract() != 0.0 || amount > u64::MAX as f64 {
                bail!("MIST amounts must be whole numbers, got {amount}");
            }
            let mist = amount as u64;
            Ok((format!("{mist} MIST"), format!("{} SUI", to_display_unit(mist))))
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

fn build(config: Option<&ClientConfig>, call: BuildCall) -> Result<TransactionDescriptor> {
    let Some(config) = config else {
        bail!("A package id is required: pass --package or --config");
    };
    let builder = TransactionBuilder::new(&config.package_id)?;
    let tx = match call {
        BuildCall::Create {
            title,
            description,
            end_date,
        } => builder.build_create(&title, &description, &end_date)?,
        BuildCall::Bet {
            market,
            prediction,
            amount,
        } => builder.build_place_bet(&market, prediction.as_bool(), amount)?,
        BuildCall::Resolve { market, outcome } => {
            let outcome = match outcome {
                Some(side) => side.as_bool(),
                None => inquire::Confirm::new("Was the outcome Yes?")
                    .with_help_message("y for Yes, n for No")
                    .prompt()
                    .context("Outcome prompt aborted")?,
            };
            builder.build_resolve(&market, outcome)?
        }
        BuildCall::Claim { market, bet } => builder.build_claim(&market, &bet)?,
    };
    Ok(tx)
}

fn print_status(market: &Market, viewer: &str) {
    let now = now_millis();
    let view = MarketView::new(market, &[], viewer, now);

    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Market ID".yellow().bold(), market.id);
    println!("{}: {}", "Title".yellow().bold(), market.title);
    println!("{}: {}", "Description".yellow().bold(), market.description);
    println!("{}: {}", "Creator".yellow().bold(), market.creator);
    println!("{}: {}", "Ends".yellow().bold(), format_timestamp(market.end_timestamp));
    println!("{}: {}", "Time Left".yellow().bold(), view.countdown);
    println!(
        "{}: Yes {:.1}% / No {:.1}%",
        "Pool Distribution".yellow().bold(),
        view.yes_pct,
        view.no_pct
    );
    println!("{}: {} SUI", "Total Pool".cyan().bold(), view.total_pool);
    println!("{}: {}", "Status".yellow().bold(), market.get_status(now));
    println!("{}", "═".repeat(50).bright_black());

    if view.can_bet {
        println!("{}", "Betting is open.".bright_blue());
    }
    if view.can_resolve {
        println!("{}", "You can resolve this market.".bright_blue());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.package.as_deref())?;
    init_logging(
        &config
            .as_ref()
            .map(|c| c.logging.clone())
            .unwrap_or_default(),
    );
    if let Some(config) = &config {
        debug!(package = %config.package_id, rpc = %config.rpc_url, "configuration loaded");
    }

    match cli.command {
        Commands::Convert { amount, unit } => {
            let (from, to) = convert(amount, unit)?;
            println!("{}: {} = {}", "Conversion".green().bold(), from.cyan(), to.yellow());
        }

        Commands::Odds { yes, no } => {
            let (yes_pct, no_pct) = pool_percentages(yes, no);
            println!("{}: {:.1}%", "Yes".green().bold(), yes_pct);
            println!("{}: {:.1}%", "No".red().bold(), no_pct);
            println!(
                "{}: {} SUI",
                "Total Pool".cyan().bold(),
                format_display(yes.saturating_add(no))
            );
        }

        Commands::Build { call } => {
            let tx = build(config.as_ref(), call)?;
            eprintln!("{}: {}", "Target".green().bold(), tx.target());
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }

        Commands::Status { market, viewer } => {
            let raw = std::fs::read_to_string(&market)
                .with_context(|| format!("Failed to read market file {}", market.display()))?;
            let market: Market = serde_json::from_str(&raw).context("Invalid market JSON")?;
            let viewer = viewer.unwrap_or_else(|| market.creator.clone());
            print_status(&market, &viewer);
        }

        Commands::Countdown { end } => {
            println!(
                "{}: {}",
                "Time Left".green().bold(),
                format_countdown(end, now_millis()).cyan()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predicrypt_core::CallArg;

    const PACKAGE: &str = "0x9C3F";

    #[test]
    fn test_package_flag_without_config() {
        let config = load_config(None, Some(PACKAGE)).unwrap().unwrap();
        assert_eq!(config.package_id, "0x9c3f");
        assert!(load_config(None, None).unwrap().is_none());
        assert!(load_config(None, Some("market")).is_err());
    }

    #[test]
    fn test_build_bet() {
        let config = ClientConfig::new(PACKAGE).unwrap();
        let tx = build(
            Some(&config),
            BuildCall::Bet {
                market: "0x4d2a".to_string(),
                prediction: Side::No,
                amount: 0.5,
            },
        )
        .unwrap();
        assert_eq!(tx.target(), "0x9c3f::prediction_market::place_bet");
        assert_eq!(tx.arguments[1], CallArg::Bool(false));
        assert_eq!(tx.split_amount(), Some(500_000_000));
    }

    #[test]
    fn test_convert() {
        let (from, to) = convert(1.5, Unit::Sui).unwrap();
        assert_eq!(from, "1.5 SUI");
        assert_eq!(to, "1500000000 MIST");
        let (_, to) = convert(2_500_000_000.0, Unit::Mist).unwrap();
        assert_eq!(to, "2.5 SUI");
    }

    #[test]
    fn test_convert_rejects_bad_amounts() {
        for unit in [Unit::Sui, Unit::Mist] {
            for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -2.5] {
                assert!(convert(amount, unit).is_err(), "{amount} should be rejected");
            }
        }
        assert!(convert(1e12, Unit::Sui).is_err());
        assert!(convert(0.5, Unit::Mist).is_err());
    }

    #[test]
    fn test_build_requires_package() {
        let call = BuildCall::Claim {
            market: "0x1".to_string(),
            bet: "0x2".to_string(),
        };
        assert!(build(None, call).is_err());
    }

    #[test]
    fn test_cli_parses_build_resolve() {
        let cli = Cli::try_parse_from([
            "predicrypt", "--package", PACKAGE, "build", "resolve", "--market", "0x1", "--outcome", "yes",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Build {
                call: BuildCall::Resolve {
                    outcome: Some(Side::Yes),
                    ..
                }
            }
        ));
    }
}
