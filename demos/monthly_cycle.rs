//! One group through two monthly meetings.
//!
//! Walks a period through attendance, collection and allocation, finalizes
//! it, then carries the balances into the following month.

use chama_ledger::prelude::*;

fn main() -> Result<(), EngineError> {
    println!("╔══════════════════════════════════════════╗");
    println!("║  chama-ledger: Monthly Audit Cycle       ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut group = Group::new("Umoja Women's Group");
    let wanjiku = group.add_member("Wanjiku", "UMJ-001")?;
    let akinyi = group.add_member("Akinyi", "UMJ-002")?;
    let njeri = group.add_member("Njeri", "UMJ-003")?;

    let mut engine = AuditEngine::new(EngineConfig::default(), MemoryGateway::new());
    let march = PeriodKey::new(3, 2025)?;

    // --- Attendance ---
    println!("━━━ {}: attendance ━━━\n", march);
    let mut ledger = engine.open_period(&group, march)?.ledger;
    engine.record_attendance(&mut ledger, wanjiku, AttendanceStatus::Present)?;
    engine.record_attendance(&mut ledger, akinyi, AttendanceStatus::Late)?;
    engine.record_attendance(&mut ledger, njeri, AttendanceStatus::Apology)?;
    engine.advance_stage(&mut ledger)?;
    for row in ledger.rows() {
        println!(
            "  {:<10} {:<8} fine {}",
            row.member_name(),
            row.attendance().map(|a| a.as_str()).unwrap_or("-"),
            row.input(InputField::Fines)
        );
    }

    // --- Collection ---
    println!("\n━━━ {}: collection ━━━\n", march);
    engine.set_input(&mut ledger, wanjiku, InputField::CashToday, 5_000)?;
    engine.set_input_text(&mut ledger, akinyi, InputField::CashToday, "3,000")?;
    engine.set_input(&mut ledger, njeri, InputField::CashToday, 2_000)?;
    for member in ledger.member_ids() {
        let row = engine.run_waterfall(&mut ledger, member)?;
        println!(
            "  {:<10} savings today {:>6}  savings CF {:>6}",
            row.member_name(),
            row.savings_today(),
            row.savings_cf()
        );
    }
    engine.advance_stage(&mut ledger)?;

    // --- Allocation ---
    println!("\n━━━ {}: allocation ━━━\n", march);
    engine.set_input(&mut ledger, wanjiku, InputField::NewLoan, 6_000)?;
    engine.set_guarantors(&mut ledger, wanjiku, vec!["UMJ-002".into(), "UMJ-003".into()])?;
    match engine.set_input(&mut ledger, njeri, InputField::NewAdvance, 1_000) {
        Ok(_) => println!("  advance recorded for Njeri"),
        Err(e) => println!("  refused: {}", e),
    }

    let preview = engine.reconcile_bank(&ledger)?;
    println!("\n{}", preview);

    let outcome = engine.finalize_period(&mut ledger)?;
    println!(
        "\n{} finalized, closing reserve {}",
        outcome.period.period, outcome.closing_reserve_balance
    );
    for w in &outcome.warnings {
        println!("  ! {}", w);
    }

    // --- Next month ---
    let april = engine.proceed_to_next_period(&group, &ledger)?.ledger;
    println!("\n━━━ {}: opening balances ━━━\n", april.period());
    for row in april.rows() {
        println!(
            "  {:<10} savings BF {:>6}  loan BF {:>6}  advance BF {:>6}",
            row.member_name(),
            row.savings_bf(),
            row.loan_bf(),
            row.advance_bf()
        );
    }

    Ok(())
}
