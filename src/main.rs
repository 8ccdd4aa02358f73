//! lending-engine CLI
//!
//! Drive the ledger against its in-memory collaborators.
//!
//! # Usage
//!
//! ```bash
//! # Walk one yield-backed deal from request to repayment
//! lending-engine demo
//!
//! # Same, as JSON, with a custom ledger config
//! lending-engine demo --format json --config ledger.json
//!
//! # Random-walk the FX rate against an open deal
//! lending-engine stress --steps 180 --volatility-bps 400 --seed 7
//! ```

use chrono::Duration;
use lending_engine::core::config::LedgerConfig;
use lending_engine::core::error::Result;
use lending_engine::core::units::micros_to_decimal;
use lending_engine::fees::calculator::FeeBreakdown;
use lending_engine::matching::request::CollateralKind;
use lending_engine::risk::attestation::AttestationRecord;
use lending_engine::risk::signature::AttestorKey;
use lending_engine::simulation::fx_stress::{self, FxStressConfig};
use lending_engine::simulation::harness::{Harness, NGN_PER_USD};
use log::info;
use rand::rngs::OsRng;
use std::fs;
use std::process;

const DEMO_COLLATERAL: u128 = 100_000_000_000;
const DEMO_DAYS: i64 = 30;
const DEMO_ACCRUAL_BPS: u128 = 15;

fn print_usage() {
    eprintln!(
        r#"lending-engine — collateralized cross-border credit ledger

USAGE:
    lending-engine <COMMAND> [OPTIONS]

COMMANDS:
    demo        Run one yield-backed deal through its full lifecycle
    stress      Random-walk the FX rate against an open deal
    help        Show this message

OPTIONS (demo):
    --config <FILE>         Ledger config as JSON (defaults otherwise)
    --format <FORMAT>       Output format: text (default) or json

OPTIONS (stress):
    --steps <N>             Number of attestations (default: 90)
    --volatility-bps <V>    Largest per-step rate move (default: 300)
    --seed <S>              Fix the random walk
    --format <FORMAT>       Output format: text (default) or json

EXAMPLES:
    lending-engine demo
    lending-engine demo --format json --config ledger.json
    lending-engine stress --steps 180 --volatility-bps 400 --seed 7"#
    );
}

/// JSON output schema for the demo.
#[derive(serde::Serialize)]
struct DemoOutput {
    deal_id: String,
    minted_units: u128,
    credit_line: u128,
    attestation: AttestationRecord,
    fees: FeeBreakdown,
    returned_to_borrower: u128,
}

fn load_config(path: &str) -> LedgerConfig {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    LedgerConfig::from_json_str(&content).unwrap_or_else(|e| {
        eprintln!("Error in config '{}': {}", path, e);
        process::exit(1);
    })
}

fn fmt_micros(value: u128) -> String {
    micros_to_decimal(value)
        .map(|d| d.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn run_demo(config: LedgerConfig) -> Result<DemoOutput> {
    let mut fx = Harness::with_config(config, AttestorKey::generate(&mut OsRng))?;
    let borrower = fx.borrower.clone();
    let attestor = fx.attestor.account_id();

    let deal_id = fx.try_open_deal(CollateralKind::YieldBearing)?;
    info!("demo deal {} opened", deal_id);
    fx.custody.mint(&borrower, DEMO_COLLATERAL);
    let minted_units = fx
        .ledger
        .deposit_yield_collateral(&borrower, &deal_id, DEMO_COLLATERAL)?;
    let credit_line = fx.ledger.credit_line(&deal_id)?;
    fx.ledger.confirm_payout(&attestor, &deal_id, "DEMO-PAYOUT")?;

    fx.clock.advance(Duration::days(DEMO_DAYS));
    fx.vault.accrue(DEMO_ACCRUAL_BPS);
    let drawn = fx
        .ledger
        .deal(&deal_id)
        .map(|d| d.amount_fiat)
        .unwrap_or_default();
    let attestation = fx.attest(&deal_id, DEMO_COLLATERAL, drawn, NGN_PER_USD)?;
    let fees = fx.ledger.fee_breakdown(&deal_id)?;

    let before = fx.custody.balance_of(&borrower);
    fx.ledger.confirm_repayment(&attestor, &deal_id, "DEMO-REPAYMENT")?;
    let returned_to_borrower = fx.custody.balance_of(&borrower).saturating_sub(before);

    Ok(DemoOutput {
        deal_id: deal_id.to_string(),
        minted_units,
        credit_line,
        attestation,
        fees,
        returned_to_borrower,
    })
}

fn cmd_demo(args: &[String]) {
    let mut config_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = config_path.as_deref().map(load_config).unwrap_or_default();
    let output = run_demo(config).unwrap_or_else(|e| {
        eprintln!("Demo failed: {}", e);
        process::exit(1);
    });

    if format == "json" {
        let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        });
        println!("{}", json);
    } else {
        let record = &output.attestation;
        let fees = &output.fees;
        println!("=== Deal Lifecycle ===");
        println!("Deal:              {}", output.deal_id);
        println!("Vault units:       {}", fmt_micros(output.minted_units));
        println!("Credit line (NGN): {}", output.credit_line);
        println!();
        println!("--- Attestation after {} days ---", DEMO_DAYS);
        println!("Collateral (USD):  {}", fmt_micros(record.collateral_usd));
        println!("Drawn (USD):       {}", fmt_micros(record.drawn_usd));
        println!("Health factor:     {}", record.health_factor);
        println!("Health state:      {}", record.health_state);
        println!();
        println!("--- Fees ---");
        println!("Gross fee (NGN):   {}", fmt_micros(fees.gross_fee));
        println!("Yield (USD):       {}", fmt_micros(fees.yield_accrued));
        println!("Yield (NGN):       {}", fmt_micros(fees.yield_in_fiat));
        println!("Net fee (NGN):     {}", fmt_micros(fees.net_fee));
        if let Some(bps) = fees.effective_yield_bps {
            println!("Effective yield:   {} bps/yr", bps.round_dp(2));
        }
        println!();
        println!(
            "Returned to borrower (USD): {}",
            fmt_micros(output.returned_to_borrower)
        );
    }
}

fn cmd_stress(args: &[String]) {
    let mut config = FxStressConfig::default();
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--steps" => {
                i += 1;
                config.steps = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--steps requires a number");
                        process::exit(1);
                    });
            }
            "--volatility-bps" => {
                i += 1;
                config.volatility_bps = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--volatility-bps requires a number");
                        process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                config.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(
                    || {
                        eprintln!("--seed requires a number");
                        process::exit(1);
                    },
                ));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let report = fx_stress::run(&config).unwrap_or_else(|e| {
        eprintln!("Stress run failed: {}", e);
        process::exit(1);
    });

    if format == "json" {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        });
        println!("{}", json);
    } else {
        print!("{}", report);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "demo" => cmd_demo(rest),
        "stress" => cmd_stress(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
