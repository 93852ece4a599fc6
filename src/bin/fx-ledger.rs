//! fx-ledger CLI - operate a wallet ledger database
//!
//! ## Example Usage
//!
//! ```bash
//! fx-ledger init
//! fx-ledger user add alice@example.com --name Alice
//! fx-ledger deposit --user 1 USD 100
//! fx-ledger convert --user 1 USD EUR 40
//! fx-ledger transfer --user 1 --to bob@example.com EUR 10
//! fx-ledger balances --user 1 --value-in ILS
//! fx-ledger rates set USD EUR 0.85 --date 2024-01-02
//! fx-ledger rates show usd/eur
//! fx-ledger --json history --user 1
//! ```

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fx_ledger::config::{LedgerConfig, RefreshPolicy};
use fx_ledger::currency::{CurrencyCode, CurrencyPair};
use fx_ledger::error::LedgerError;
use fx_ledger::ledger::Ledger;
use fx_ledger::store::DEFAULT_HISTORY_DAYS;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

/// fx-ledger: multi-currency wallet ledger
#[derive(Parser)]
#[command(name = "fx-ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-currency wallet ledger", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema
    Init,

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Credit a wallet
    Deposit {
        #[arg(short, long)]
        user: i64,
        currency: String,
        amount: Decimal,
    },

    /// Debit a wallet
    Withdraw {
        #[arg(short, long)]
        user: i64,
        currency: String,
        amount: Decimal,
    },

    /// Convert between two of a user's wallets
    Convert {
        #[arg(short, long)]
        user: i64,
        from: String,
        to: String,
        amount: Decimal,
    },

    /// Send funds to another user by email
    Transfer {
        #[arg(short, long)]
        user: i64,

        /// Recipient email
        #[arg(long)]
        to: String,

        currency: String,
        amount: Decimal,

        /// Currency the recipient is credited in (default: same as sent)
        #[arg(long)]
        into: Option<String>,
    },

    /// Show a user's wallets
    Balances {
        #[arg(short, long)]
        user: i64,

        /// Also value the whole portfolio in this currency
        #[arg(long)]
        value_in: Option<String>,
    },

    /// Show a user's recent transactions
    History {
        #[arg(short, long)]
        user: i64,

        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },

    /// Inspect and maintain exchange rates
    Rates {
        #[command(subcommand)]
        action: RatesAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Look a user up by email or id
    Show {
        /// Email address or numeric user id
        user: String,
    },
}

#[derive(Subcommand)]
enum RatesAction {
    /// Resolve the rate a conversion would use now
    Show {
        /// Currency pair, e.g. USD/EUR
        pair: String,
    },

    /// Stored daily rates for a pair, oldest first
    History {
        /// Currency pair, e.g. USD/EUR
        pair: String,
        #[arg(short = 'd', long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,
    },

    /// Store a rate for a day (default: today)
    Set {
        from: String,
        to: String,
        rate: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Pull the configured rate feed once
    Refresh,

    /// Keep refreshing on the configured interval until interrupted
    Watch {
        /// Seconds between refreshes (default: from configuration)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    if let Some(config_path) = path {
        return LedgerConfig::load(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()));
    }

    // Try default location
    if let Some(home) = dirs::home_dir() {
        let default_config = home.join(".fx-ledger").join("config.toml");
        if default_config.exists() {
            match LedgerConfig::load(&default_config) {
                Ok(config) => return Ok(config),
                Err(e) => eprintln!("{} Ignoring {}: {}", "Warning:".yellow(), default_config.display(), e),
            }
        }
    }

    Ok(LedgerConfig::default())
}

fn currency(input: &str) -> anyhow::Result<CurrencyCode> {
    Ok(CurrencyCode::normalize(input)?)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<LedgerError>() {
            Some(ledger_error) => eprintln!(
                "{} [{}] {}",
                "Error:".red().bold(),
                ledger_error.kind(),
                ledger_error
            ),
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    config.validate()?;

    if cli.verbose {
        println!("{} v{}", "fx-ledger".cyan().bold(), env!("CARGO_PKG_VERSION"));
        println!("Database: {}", config.database_path.display().to_string().dimmed());
        println!("Reference currency: {}", config.reference_currency.dimmed());
    }

    let mut ledger = open_ledger(&config)?;
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            println!(
                "{} {}",
                "Initialized".green().bold(),
                config.database_path.display()
            );
        }

        Commands::User { action } => match action {
            UserAction::Add { email, name } => {
                let user = ledger.store().users().create(&email, name.as_deref())?;
                emit(json, &user, || format!("Created user {} <{}>", user.id.to_string().bold(), user.email))?;
            }
            UserAction::Show { user } => {
                let users = ledger.store().users();
                let found = match user.trim().parse::<i64>() {
                    Ok(id) => users.by_id(id)?,
                    Err(_) => users.by_email(&user)?,
                };
                match found {
                    Some(found) => emit(json, &found, || {
                        format!(
                            "{} <{}> {}",
                            found.id.to_string().bold(),
                            found.email,
                            found.name.clone().unwrap_or_default()
                        )
                    })?,
                    None => return Err(LedgerError::RecipientNotFound(user.trim().to_string()).into()),
                }
            }
        },

        Commands::Deposit { user, currency: code, amount } => {
            let code = currency(&code)?;
            let balance = ledger.deposit(user, &code, amount)?;
            emit(json, &BalanceReport { currency: &code, balance }, || {
                format!("{} {} {}", "Balance".green(), balance, code)
            })?;
        }

        Commands::Withdraw { user, currency: code, amount } => {
            let code = currency(&code)?;
            let balance = ledger.withdraw(user, &code, amount)?;
            emit(json, &BalanceReport { currency: &code, balance }, || {
                format!("{} {} {}", "Balance".green(), balance, code)
            })?;
        }

        Commands::Convert { user, from, to, amount } => {
            let (from, to) = (currency(&from)?, currency(&to)?);
            let outcome = ledger.convert(user, &from, &to, amount)?;
            emit(json, &outcome, || {
                format!(
                    "{} {} {} -> {} {} at {} ({})\n{} {} {}, {} {}",
                    "Converted".green().bold(),
                    amount,
                    from,
                    outcome.converted_amount,
                    to,
                    outcome.rate,
                    outcome.resolution,
                    "Balances:".dimmed(),
                    outcome.from_balance,
                    from,
                    outcome.to_balance,
                    to
                )
            })?;
        }

        Commands::Transfer { user, to, currency: code, amount, into } => {
            let from = currency(&code)?;
            let target = match into {
                Some(into) => currency(&into)?,
                None => from.clone(),
            };
            let outcome = ledger.transfer(user, &to, &from, &target, amount)?;
            emit(json, &outcome, || {
                format!(
                    "{} {} {} to user {} ({} {})\n{} {} {}",
                    "Sent".green().bold(),
                    amount,
                    from,
                    outcome.to_user_id,
                    outcome.converted_amount,
                    target,
                    "Balance:".dimmed(),
                    outcome.from_new_balance,
                    from
                )
            })?;
        }

        Commands::Balances { user, value_in } => {
            let wallets = ledger.balances(user)?;
            let total = match value_in {
                Some(code) => {
                    let code = currency(&code)?;
                    let value = ledger.portfolio_value(user, &code)?;
                    Some((code, value))
                }
                None => None,
            };

            if json {
                let report = serde_json::json!({
                    "wallets": wallets,
                    "total": total.as_ref().map(|(code, value)| serde_json::json!({"currency": code, "value": value})),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", format!("Wallets of user {}", user).cyan().bold());
                if wallets.is_empty() {
                    println!("{}", "(none)".dimmed());
                }
                for wallet in &wallets {
                    println!("  {:<4} {:>16} {}", wallet.currency, wallet.balance, wallet.currency.symbol().dimmed());
                }
                if let Some((code, value)) = total {
                    println!("  {} {} {}", "Total:".bold(), value, code);
                }
            }
        }

        Commands::History { user, limit } => {
            let records = ledger.history(user, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                let users = ledger.store().users();
                for record in &records {
                    let counterparty = match record.counterparty_id {
                        Some(id) if record.is_transfer() => match users.by_id(id)? {
                            Some(other) => format!(" with {}", other.email),
                            None => format!(" with user {}", id),
                        },
                        _ => String::new(),
                    };
                    println!(
                        "{:>6} {} {:<8} {} {} -> {} @ {} balance {}{}",
                        record.id,
                        record.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                        record.kind.to_string().bold(),
                        record.amount,
                        record.currency_from,
                        record.currency_to,
                        record.rate,
                        record.balance_after,
                        counterparty
                    );
                }
                let total = ledger.store().transactions().count_for_user(user)?;
                println!("{}", format!("{} of {} transactions", records.len(), total).dimmed());
            }
        }

        Commands::Rates { action } => handle_rates(action, &mut ledger, &config, json)?,
    }

    Ok(())
}

#[derive(Serialize)]
struct BalanceReport<'a> {
    currency: &'a CurrencyCode,
    balance: Decimal,
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

fn handle_rates(action: RatesAction, ledger: &mut Ledger, config: &LedgerConfig, json: bool) -> anyhow::Result<()> {
    match action {
        RatesAction::Show { pair } => {
            let pair = CurrencyPair::parse(&pair)?;
            let resolved = ledger.quote(&pair.from, &pair.to)?;
            let inverse = pair.inverse();
            let reverse = if pair.is_identity() {
                None
            } else {
                ledger.quote(&inverse.from, &inverse.to).ok()
            };
            emit(json, &resolved, || {
                let date = resolved.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
                let mut line = format!("{} = {} ({}, {})", pair, resolved.rate.to_string().bold(), resolved.resolution, date);
                if let Some(reverse) = &reverse {
                    line.push_str(&format!("\n{} = {} ({})", inverse, reverse.rate, reverse.resolution).dimmed().to_string());
                }
                line
            })?;
        }

        RatesAction::History { pair, days } => {
            let pair = CurrencyPair::parse(&pair)?;
            let quotes = ledger.rate_history(&pair.from, &pair.to, days)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quotes)?);
            } else {
                println!("{}", pair.to_string().cyan().bold());
                for quote in &quotes {
                    println!("  {} {}", quote.date, quote.rate);
                }
            }
        }

        RatesAction::Set { from, to, rate, date } => {
            let pair = CurrencyPair::new(currency(&from)?, currency(&to)?);
            if pair.is_identity() {
                bail!("{} always converts at 1", pair);
            }
            if rate <= Decimal::ZERO {
                bail!("rate must be positive, got {}", rate);
            }
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            ledger.store().rates().upsert(&pair.from, &pair.to, date, rate)?;
            println!("{} {} = {} on {}", "Stored".green(), pair, rate, date);
        }

        RatesAction::Refresh => {
            let written = refresh_once(ledger, config)?;
            println!("{} {} rate rows", "Refreshed".green().bold(), written);
        }

        RatesAction::Watch { interval } => watch(config, interval)?,
    }
    Ok(())
}

#[cfg(feature = "async")]
fn open_ledger(config: &LedgerConfig) -> anyhow::Result<Ledger> {
    use fx_ledger::fx::{HttpRateFeed, RateIngestor};

    let ledger = Ledger::from_config(config)?;
    if config.refresh == RefreshPolicy::BeforeConvert {
        let feed = HttpRateFeed::from_config(&config.feed)?;
        return Ok(ledger.with_feed(Box::new(feed), RateIngestor::from_config(config)?));
    }
    Ok(ledger)
}

#[cfg(not(feature = "async"))]
fn open_ledger(config: &LedgerConfig) -> anyhow::Result<Ledger> {
    if config.refresh != RefreshPolicy::Disabled {
        eprintln!(
            "{} refresh policy ignored, built without the `async` feature",
            "Warning:".yellow()
        );
    }
    Ok(Ledger::from_config(config)?)
}

#[cfg(feature = "async")]
fn refresh_once(ledger: &mut Ledger, config: &LedgerConfig) -> anyhow::Result<usize> {
    use fx_ledger::fx::{HttpRateFeed, RateIngestor};

    let feed = HttpRateFeed::from_config(&config.feed)?;
    Ok(RateIngestor::from_config(config)?.refresh(ledger.store_mut(), &feed)?)
}

#[cfg(not(feature = "async"))]
fn refresh_once(_ledger: &mut Ledger, _config: &LedgerConfig) -> anyhow::Result<usize> {
    bail!("rate feed support requires the `async` feature")
}

#[cfg(feature = "async")]
fn watch(config: &LedgerConfig, interval: Option<u64>) -> anyhow::Result<()> {
    use fx_ledger::fx::{BackgroundRefresher, HttpRateFeed, RateFeed, RateIngestor, RefresherSettings};
    use std::sync::Arc;
    use std::time::Duration;

    let interval_secs = match (interval, &config.refresh) {
        (Some(secs), _) => secs,
        (None, RefreshPolicy::Background { interval_secs }) => *interval_secs,
        (None, _) => 3600,
    };
    if interval_secs == 0 {
        bail!("refresh interval must be positive");
    }

    let settings = RefresherSettings {
        database_path: config.database_path.clone(),
        busy_timeout: config.busy_timeout(),
        interval: Duration::from_secs(interval_secs),
    };
    let feed = Arc::new(HttpRateFeed::from_config(&config.feed)?);
    let ingestor = RateIngestor::from_config(config)?;

    // The blocking HTTP client must not be dropped on a runtime thread, so
    // the last reference stays out here
    let task_feed: Arc<dyn RateFeed> = feed.clone();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let result = runtime.block_on(async move {
        let handle = BackgroundRefresher::spawn(settings, task_feed, ingestor);
        println!(
            "{} every {}s, press Ctrl-C to stop",
            "Refreshing rates".cyan().bold(),
            interval_secs
        );
        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
        let (completed, failed) = (handle.completed_runs(), handle.failed_runs());
        handle.shutdown().await;
        println!("{} {} refreshes, {} failed", "Stopped after".green(), completed, failed);
        Ok(())
    });
    drop(runtime);
    drop(feed);
    result
}

#[cfg(not(feature = "async"))]
fn watch(_config: &LedgerConfig, _interval: Option<u64>) -> anyhow::Result<()> {
    bail!("rate feed support requires the `async` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_command() {
        let cli = Cli::try_parse_from(["fx-ledger", "convert", "--user", "1", "usd", "EUR", "40.5"]).unwrap();
        match cli.command {
            Commands::Convert { user, from, to, amount } => {
                assert_eq!(user, 1);
                assert_eq!(currency(&from).unwrap().as_str(), "USD");
                assert_eq!(to, "EUR");
                assert_eq!(amount, Decimal::new(405, 1));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_transfer_command() {
        let cli = Cli::try_parse_from([
            "fx-ledger", "--json", "transfer", "-u", "1", "--to", "bob@example.com", "USD", "10", "--into", "EUR",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Transfer { into: Some(_), .. }));
    }

    #[test]
    fn test_rates_set_parses_date() {
        let cli = Cli::try_parse_from(["fx-ledger", "rates", "set", "USD", "EUR", "0.85", "--date", "2024-01-02"]).unwrap();
        match cli.command {
            Commands::Rates { action: RatesAction::Set { date, .. } } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2));
            }
            _ => panic!("expected rates set"),
        }
    }

    #[test]
    fn test_rates_show_takes_pair() {
        let cli = Cli::try_parse_from(["fx-ledger", "rates", "show", "usdeur"]).unwrap();
        match cli.command {
            Commands::Rates { action: RatesAction::Show { pair } } => {
                assert_eq!(CurrencyPair::parse(&pair).unwrap().to_string(), "USD/EUR");
            }
            _ => panic!("expected rates show"),
        }
    }

    #[test]
    fn test_user_show_takes_email_or_id() {
        let cli = Cli::try_parse_from(["fx-ledger", "user", "show", "42"]).unwrap();
        match cli.command {
            Commands::User { action: UserAction::Show { user } } => assert_eq!(user.parse::<i64>().unwrap(), 42),
            _ => panic!("expected user show"),
        }
        assert!(Cli::try_parse_from(["fx-ledger", "user", "show", "bob@example.com"]).is_ok());
    }

    #[test]
    fn test_rejects_bad_amount() {
        assert!(Cli::try_parse_from(["fx-ledger", "deposit", "-u", "1", "USD", "ten"]).is_err());
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/fx-ledger.toml"))).is_err());
    }
}
