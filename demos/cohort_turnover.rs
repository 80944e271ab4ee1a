//! Roster turnover between two periods of a simulated group.
//!
//! Runs a generated January session, then drops one member and enrols a
//! new one before February. Balances follow members by id; the leaver's
//! balances are reported, the joiner starts from zero.

use chama_ledger::core::ledger::AttendanceStatus;
use chama_ledger::prelude::*;
use chama_ledger::simulation::cohort::{generate_session, CohortConfig};
use chama_ledger::workflow::session::{run_session, MemberEntry, SessionFile};
use serde_json::json;

fn main() -> Result<(), EngineError> {
    println!("╔══════════════════════════════════════════╗");
    println!("║  chama-ledger: Cohort Turnover           ║");
    println!("╚══════════════════════════════════════════╝\n");

    let config = CohortConfig {
        member_count: 8,
        month: 1,
        year: 2025,
        ..Default::default()
    };
    let january = generate_session(&config);
    let mut engine = AuditEngine::new(EngineConfig::default(), MemoryGateway::new());

    let report = run_session(&mut engine, &january)?;
    println!("━━━ {} ━━━\n", report.ledger.period());
    print!("{}", report.finalize.reconciliation);
    println!("\nTotal savings CF: {}", report.totals.savings_cf);
    for w in &report.warnings {
        println!("  ! {}", w);
    }

    // --- Roster change ---
    let mut group = january.group;
    let leaver = group.members()[0].id();
    if let Some(member) = group.remove_member(leaver) {
        println!("\n{} leaves the group", member.name());
    }
    group.add_member("Newcomer", "ACC-9001")?;
    println!("Newcomer joins with account ACC-9001\n");

    let entries = group
        .members()
        .iter()
        .map(|m| MemberEntry {
            account_number: m.account_number().to_string(),
            attendance: Some(AttendanceStatus::Present),
            cash_today: Some(json!(1_000)),
            ..Default::default()
        })
        .collect();
    let february = SessionFile {
        group,
        month: 2,
        year: 2025,
        entries,
    };

    let report = run_session(&mut engine, &february)?;
    println!("━━━ {} ━━━\n", report.ledger.period());
    for row in report.ledger.rows() {
        println!(
            "  {:<12} savings BF {:>7}  savings CF {:>7}",
            row.member_name(),
            row.savings_bf(),
            row.savings_cf()
        );
    }
    for w in &report.warnings {
        println!("  ! {}", w);
    }
    println!(
        "\nStored periods: {}",
        engine.gateway().history(february.group.id()).len()
    );

    Ok(())
}
