//! chama-ledger CLI
//!
//! Run the period ledger engine from the command line.
//!
//! # Usage
//!
//! ```bash
//! # One member's waterfall
//! chama-ledger waterfall --savings-bf 500 --loan-bf 200 --cash 1000 --fines 50 --loan-principal 100
//!
//! # Bank reconciliation for a period's totals
//! chama-ledger reconcile --opening 1000 --cash 5000 --loans 3000 --advances 500
//!
//! # Run and persist a full period from a session file
//! chama-ledger audit --input january.json --store ledger-store.json
//!
//! # Generate a random session file
//! chama-ledger generate --members 20 --month 1 --year 2025 --output january.json
//! ```

use chama_ledger::calculation::interest::RoundingPolicy;
use chama_ledger::calculation::waterfall::{WaterfallInputs, MAX_AMOUNT};
use chama_ledger::config::EngineConfig;
use chama_ledger::core::ledger::InputField;
use chama_ledger::persistence::memory::MemoryGateway;
use chama_ledger::reconciliation::bank::{BankReconciler, CashFlow};
use chama_ledger::simulation::cohort::{generate_session, CohortConfig};
use chama_ledger::workflow::engine::AuditEngine;
use chama_ledger::workflow::session::{run_session, SessionFile, SessionReport};
use serde::Serialize;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"chama-ledger: period ledger and audit workflow for savings groups

USAGE:
    chama-ledger <COMMAND> [OPTIONS]

COMMANDS:
    waterfall   Compute one member's interest, savings and closing balances
    reconcile   Reconcile a period's cash against the group reserve
    audit       Run and finalize a full period from a session file
    generate    Generate a random session file (for testing)
    help        Show this message

OPTIONS (waterfall):
    --savings-bf <N> --loan-bf <N> --advance-bf <N>
    --cash <N> --fines <N> --loan-principal <N> --advance-principal <N> --new-loan <N>
    --rounding <POLICY>  truncate (default) or nearest_five

OPTIONS (reconcile):
    --opening <N> --cash <N> --loans <N> --advances <N> --withdrawals <N>

OPTIONS (audit):
    --input <FILE>      Session JSON file
    --config <FILE>     Engine config JSON file
    --store <FILE>      Ledger store JSON file (default: chama-store.json)
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (generate):
    --members <N>       Number of members (default: 20)
    --month <M>         Month 1-12 (default: 1)
    --year <Y>          Year (default: 2025)
    --output <FILE>     Write to file instead of stdout

Set RUST_LOG=info (or debug) for engine logs."#
    );
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    process::exit(1);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e))
}

/// Split `--flag value` pairs, rejecting anything else.
fn parse_flags(args: &[String]) -> Vec<(String, String)> {
    let mut flags = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let flag = &args[i];
        if !flag.starts_with("--") {
            fail(format!("unexpected argument '{}'", flag));
        }
        let value = args
            .get(i + 1)
            .cloned()
            .unwrap_or_else(|| fail(format!("{} requires a value", flag)));
        flags.push((flag.clone(), value));
        i += 2;
    }
    flags
}

fn number<T: std::str::FromStr>(flag: &str, value: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| fail(format!("{} requires a number, got '{}'", flag, value)))
}

/// A money flag: a whole number between 0 and `MAX_AMOUNT`.
fn amount(flag: &str, value: &str) -> i64 {
    let n: i64 = number(flag, value);
    if !(0..=MAX_AMOUNT).contains(&n) {
        fail(format!("{} must be between 0 and {}, got {}", flag, MAX_AMOUNT, n));
    }
    n
}

fn cmd_waterfall(args: &[String]) {
    let mut inputs = WaterfallInputs::default();
    let mut config = EngineConfig::default();
    for (flag, value) in parse_flags(args) {
        match flag.as_str() {
            "--savings-bf" => inputs.savings_bf = amount(&flag, &value),
            "--loan-bf" => inputs.loan_bf = amount(&flag, &value),
            "--advance-bf" => inputs.advance_bf = amount(&flag, &value),
            "--cash" => inputs.cash_today = amount(&flag, &value),
            "--fines" => inputs.fines = amount(&flag, &value),
            "--loan-principal" => inputs.loan_principal = amount(&flag, &value),
            "--advance-principal" => inputs.advance_principal = amount(&flag, &value),
            "--new-loan" => inputs.new_loan = amount(&flag, &value),
            "--rounding" => {
                config.rounding = match value.as_str() {
                    "truncate" => RoundingPolicy::Truncate,
                    "nearest_five" => RoundingPolicy::NearestFive,
                    other => fail(format!("unknown rounding policy '{}'", other)),
                }
            }
            _ => fail(format!("unknown option: {}", flag)),
        }
    }

    let r = config.waterfall().compute(&inputs);
    println!("=== Waterfall ===");
    println!("Advance Interest: {}", r.advance_interest);
    println!("Loan Interest:    {}", r.loan_interest);
    println!("Deductions:       {}", r.deductions);
    println!("Savings Today:    {}", r.savings_today);
    println!("Savings CF:       {}", r.savings_cf);
    println!("Loan CF:          {}", r.loan_cf);
    println!("Advance CF:       {}", r.advance_cf);
    if r.is_deficit() {
        println!("\nNote: contribution did not cover deductions (deficit of {})", -r.savings_today);
    }
}

fn cmd_reconcile(args: &[String]) {
    let mut opening = 0i64;
    let mut flow = CashFlow::default();
    for (flag, value) in parse_flags(args) {
        match flag.as_str() {
            "--opening" => opening = amount(&flag, &value),
            "--cash" => flow.cash_collected = amount(&flag, &value),
            "--loans" => flow.new_loans = amount(&flag, &value),
            "--advances" => flow.new_advances = amount(&flag, &value),
            "--withdrawals" => flow.withdrawals = amount(&flag, &value),
            _ => fail(format!("unknown option: {}", flag)),
        }
    }
    let r = BankReconciler::reconcile(opening, &flow);
    print!("{}", r);
    if r.needs_external_borrowing() {
        println!("\n!! CRITICAL: {} must be borrowed externally", r.external_borrowing);
    }
}

fn print_report(report: &SessionReport) {
    let ledger = &report.ledger;
    println!("=== {} ({}) ===", ledger.period(), ledger.stage());
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Member", "Cash", "Sav BF", "Sav Tdy", "Sav CF", "Loan CF", "Adv CF", "Fines"
    );
    for row in ledger.rows() {
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            row.member_name(),
            row.input(InputField::CashToday),
            row.savings_bf(),
            row.savings_today(),
            row.savings_cf(),
            row.loan_cf(),
            row.advance_cf(),
            row.input(InputField::Fines),
        );
    }
    let t = &report.totals;
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "TOTALS", t.cash_today, t.savings_bf, t.savings_today, t.savings_cf, t.loan_cf, t.advance_cf, t.fines
    );
    println!();
    print!("{}", report.finalize.reconciliation);
    println!(
        "\nClosing reserve recorded: {}",
        report.finalize.closing_reserve_balance
    );
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }
}

fn cmd_audit(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut store_path = "chama-store.json".to_string();
    let mut format = "text".to_string();
    for (flag, value) in parse_flags(args) {
        match flag.as_str() {
            "--input" => input_path = Some(value),
            "--config" => config_path = Some(value),
            "--store" => store_path = value,
            "--format" => format = value,
            _ => fail(format!("unknown option: {}", flag)),
        }
    }

    let input_path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let content = fs::read_to_string(&input_path)
        .unwrap_or_else(|e| fail(format!("reading '{}': {}", input_path, e)));
    let session: SessionFile =
        serde_json::from_str(&content).unwrap_or_else(|e| fail(format!("parsing session: {}", e)));

    let config = match config_path {
        Some(path) => EngineConfig::load(&path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };
    let store = MemoryGateway::open(&store_path).unwrap_or_else(|e| fail(e));

    let mut engine = AuditEngine::new(config, store);
    let report = run_session(&mut engine, &session).unwrap_or_else(|e| fail(e));
    engine
        .into_gateway()
        .flush(&store_path)
        .unwrap_or_else(|e| fail(e));

    if format == "json" {
        println!("{}", to_json(&report));
    } else {
        print_report(&report);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = CohortConfig::default();
    let mut output_path: Option<String> = None;
    for (flag, value) in parse_flags(args) {
        match flag.as_str() {
            "--members" => config.member_count = number(&flag, &value),
            "--month" => config.month = number(&flag, &value),
            "--year" => config.year = number(&flag, &value),
            "--output" => output_path = Some(value),
            _ => fail(format!("unknown option: {}", flag)),
        }
    }

    let session = generate_session(&config);
    let json = to_json(&session);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| fail(format!("writing '{}': {}", path, e)));
        eprintln!(
            "Generated a session for {} members → {}",
            session.entries.len(),
            path
        );
    } else {
        println!("{}", json);
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
        "waterfall" => cmd_waterfall(rest),
        "reconcile" => cmd_reconcile(rest),
        "audit" => cmd_audit(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
