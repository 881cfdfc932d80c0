/*!
 * KID Registry CLI
 *
 * Runs one identity invocation against a local RocksDB ledger, acting as
 * the single ordering node: it supplies the caller identity, the
 * transaction id and the transaction time, then commits on success.
 *
 * Usage:
 *   kid-cli --identity <id> --serial <hex> --pin 1234 register
 *   kid-cli --identity <id> --serial <hex> get
 *   kid-cli --identity <id> --serial <hex> --pin 1234 revoke <sn>
 *   kid-cli --identity <id> --serial <hex> list [bookmark]
 */

mod config;
mod invoke;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use config::CliConfig;
use invoke::{execute, Invocation};
use kid_identity::Chaincode;
use kid_ledger::RocksDbLedger;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kid-cli")]
#[command(about = "Manage KIDs, PINs and certificates on a local ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ledger database path (defaults to KID_LEDGER_PATH)
    #[arg(short, long)]
    ledger: Option<PathBuf>,

    /// Caller identity as asserted by the certificate authority
    #[arg(short, long)]
    identity: String,

    /// Caller certificate serial number (hex)
    #[arg(short, long)]
    serial: String,

    /// Current PIN
    #[arg(short, long)]
    pin: Option<String>,

    /// Replacement PIN for the `pin` command
    #[arg(long)]
    new_pin: Option<String>,

    /// Transaction id (random when omitted)
    #[arg(long)]
    tx_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the caller's KID id and certificate serial
    Get,
    /// Print the caller's KID id
    Kid {
        /// Require the PIN
        #[arg(long)]
        secure: bool,
    },
    /// List the caller's active certificates
    List {
        /// Bookmark returned by the previous page
        bookmark: Option<String>,
    },
    /// Replace the PIN (requires --pin and --new-pin)
    Pin,
    /// Register the caller's certificate, creating the KID if needed
    Register,
    /// Revoke one of the caller's certificates
    Revoke {
        /// Serial number (hex, any case, leading zeros optional) of the certificate to revoke
        sn: String,
    },
    /// Lock the KID to the caller's certificate
    Lock,
    /// Remove the KID's certificate lock
    Unlock,
}

impl Commands {
    fn into_call(self) -> (&'static str, Vec<String>) {
        match self {
            Commands::Get => ("get", Vec::new()),
            Commands::Kid { secure } => {
                let params = if secure { vec!["secure".to_string()] } else { Vec::new() };
                ("kid", params)
            }
            Commands::List { bookmark } => ("list", bookmark.into_iter().collect()),
            Commands::Pin => ("pin", Vec::new()),
            Commands::Register => ("register", Vec::new()),
            Commands::Revoke { sn } => ("revoke", vec![sn]),
            Commands::Lock => ("lock", Vec::new()),
            Commands::Unlock => ("unlock", Vec::new()),
        }
    }
}

/// Decode a hex serial number, tolerating an odd number of digits
fn parse_serial(serial: &str) -> Result<Vec<u8>> {
    let serial = serial.trim_start_matches("0x");
    let padded = if serial.len() % 2 == 1 {
        format!("0{}", serial)
    } else {
        serial.to_string()
    };
    hex::decode(&padded).with_context(|| format!("invalid serial number: '{}'", serial))
}

fn run(cli: Cli) -> Result<Vec<u8>> {
    let mut config = CliConfig::from_env()?;
    if let Some(path) = cli.ledger {
        config.ledger_path = path;
    }

    if let Some(parent) = config.ledger_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let ledger = RocksDbLedger::open(&config.ledger_path, &config.collections())
        .with_context(|| format!("failed to open ledger at {}", config.ledger_path.display()))?;
    tracing::debug!(path = %config.ledger_path.display(), "Ledger opened");

    let span = tracing::info_span!("kid");
    let chaincode = Chaincode::new(config.stub.clone(), span);

    let (function, params) = cli.command.into_call();
    let invocation = Invocation {
        identity: cli.identity,
        serial_number: parse_serial(&cli.serial)?,
        pin: cli.pin,
        new_pin: cli.new_pin,
        tx_id: cli.tx_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        function: function.to_string(),
        params,
    };

    execute(&ledger, &chaincode, invocation)
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kid_cli=info,kid_identity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(payload) => {
            println!("{}", String::from_utf8_lossy(&payload));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), format!("{:#}", e).red());
            ExitCode::FAILURE
        }
    }
}
