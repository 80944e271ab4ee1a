use chama_ledger::calculation::interest::RoundingPolicy;
use chama_ledger::calculation::waterfall::WaterfallInputs;
use chama_ledger::config::EngineConfig;
use chama_ledger::core::ledger::{AttendanceStatus, InputField, PeriodLedger};
use chama_ledger::core::member::{Group, MemberId};
use chama_ledger::core::period::{AuditStage, PeriodKey, WorkflowVariant};
use chama_ledger::error::{EngineError, ValidationError, Warning};
use chama_ledger::persistence::gateway::PersistenceGateway;
use chama_ledger::persistence::memory::MemoryGateway;
use chama_ledger::reconciliation::bank::{BankReconciler, CashFlow};
use chama_ledger::workflow::engine::{AuditEngine, StageOutcome};

fn key(month: u32, year: i32) -> PeriodKey {
    PeriodKey::new(month, year).unwrap()
}

fn simplified() -> EngineConfig {
    EngineConfig {
        workflow: WorkflowVariant::Simplified,
        ..Default::default()
    }
}

/// Fill collection fields for one member.
fn collect(
    engine: &AuditEngine<MemoryGateway>,
    ledger: &mut PeriodLedger,
    member: MemberId,
    figures: &[(InputField, i64)],
) {
    for (field, value) in figures {
        engine.set_input(ledger, member, *field, *value).unwrap();
    }
}

/// Member month with an outstanding loan, truncating interest.
#[test]
fn scenario_a_member_waterfall() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();

    // Seed history so Alice opens with savings 500 and loan 200.
    let mut store = MemoryGateway::new();
    {
        let mut seed = AuditEngine::new(simplified(), &mut store);
        let mut ledger = seed.open_period(&group, key(12, 2024)).unwrap().ledger;
        seed.set_input(&mut ledger, a, InputField::CashToday, 500).unwrap();
        seed.advance_stage(&mut ledger).unwrap();
        seed.set_input(&mut ledger, a, InputField::NewLoan, 200).unwrap();
        seed.finalize_period(&mut ledger).unwrap();
    }

    let engine = AuditEngine::new(simplified(), store);
    let mut ledger = engine.open_period(&group, key(1, 2025)).unwrap().ledger;
    let row = ledger.row(a).unwrap();
    assert_eq!(row.savings_bf(), 500);
    assert_eq!(row.loan_bf(), 200);

    collect(
        &engine,
        &mut ledger,
        a,
        &[
            (InputField::CashToday, 1000),
            (InputField::Fines, 50),
            (InputField::LoanPrincipal, 100),
        ],
    );
    let row = engine.run_waterfall(&mut ledger, a).unwrap();
    assert_eq!(row.loan_interest(), 3);
    assert_eq!(row.savings_today(), 847);
    assert_eq!(row.savings_cf(), 1347);
    assert_eq!(row.loan_cf(), 100);
    assert!(row.balances_hold());

    let direct = engine.config().waterfall().compute(&WaterfallInputs {
        savings_bf: 500,
        loan_bf: 200,
        cash_today: 1000,
        fines: 50,
        loan_principal: 100,
        ..Default::default()
    });
    assert_eq!(direct.deductions, 153);
}

#[test]
fn scenario_b_surplus_to_bank() {
    let flow = CashFlow {
        cash_collected: 5000,
        new_loans: 3000,
        new_advances: 500,
        withdrawals: 0,
    };
    let r = BankReconciler::reconcile(1000, &flow);
    assert_eq!(r.to_bank, 1500);
    assert_eq!(r.new_reserve, 2500);
    assert_eq!(r.withdrawn, 0);
    assert_eq!(r.external_borrowing, 0);
}

#[test]
fn scenario_c_reserve_exhausted() {
    let flow = CashFlow {
        cash_collected: 1000,
        new_loans: 2000,
        ..Default::default()
    };
    let r = BankReconciler::reconcile(200, &flow);
    assert_eq!(r.withdrawn, 200);
    assert_eq!(r.new_reserve, 0);
    assert_eq!(r.external_borrowing, 800);
}

/// Roster changes between periods: B leaves, C joins.
#[test]
fn scenario_d_roster_turnover() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let b = group.add_member("Bob", "ACC-002").unwrap();

    let mut engine = AuditEngine::new(simplified(), MemoryGateway::new());
    let mut ledger = engine.open_period(&group, key(1, 2025)).unwrap().ledger;
    collect(&engine, &mut ledger, a, &[(InputField::CashToday, 300)]);
    collect(&engine, &mut ledger, b, &[(InputField::CashToday, 150)]);
    engine.advance_stage(&mut ledger).unwrap();
    engine.finalize_period(&mut ledger).unwrap();
    assert_eq!(ledger.row(a).unwrap().savings_cf(), 300);
    assert_eq!(ledger.row(b).unwrap().savings_cf(), 150);

    group.remove_member(b);
    let c = group.add_member("Carol", "ACC-003").unwrap();

    let opening = engine.proceed_to_next_period(&group, &ledger).unwrap();
    let next = opening.ledger;
    assert_eq!(next.period(), key(2, 2025));
    assert_eq!(next.row(a).unwrap().savings_bf(), 300);
    assert_eq!(next.row(c).unwrap().savings_bf(), 0);
    assert!(next.row(b).is_none());
    assert_eq!(next.len(), 2);

    assert_eq!(opening.warnings.len(), 1);
    assert!(matches!(
        opening.warnings[0],
        Warning::DepartedMember { balances } if balances.member_id == b && balances.savings_cf == 150
    ));
}

#[test]
fn full_workflow_with_attendance() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let b = group.add_member("Bob", "ACC-002").unwrap();
    let c = group.add_member("Carol", "ACC-003").unwrap();

    let mut engine = AuditEngine::new(EngineConfig::default(), MemoryGateway::new());
    let mut ledger = engine.open_period(&group, key(3, 2025)).unwrap().ledger;
    assert_eq!(ledger.stage(), AuditStage::AttendanceCheck);

    // Nothing monetary is editable before attendance is confirmed.
    assert!(engine
        .set_input(&mut ledger, a, InputField::CashToday, 100)
        .is_err());

    engine.record_attendance(&mut ledger, a, AttendanceStatus::Present).unwrap();
    engine.record_attendance(&mut ledger, b, AttendanceStatus::Late).unwrap();
    engine.record_attendance(&mut ledger, c, AttendanceStatus::Apology).unwrap();

    let outcome = engine.advance_stage(&mut ledger).unwrap();
    assert!(matches!(
        outcome,
        StageOutcome::Advanced {
            from: AuditStage::AttendanceCheck,
            to: AuditStage::Collection
        }
    ));
    assert!(engine
        .record_attendance(&mut ledger, c, AttendanceStatus::Present)
        .is_err());

    collect(&engine, &mut ledger, a, &[(InputField::CashToday, 4000)]);
    collect(&engine, &mut ledger, b, &[(InputField::CashToday, 2000)]);
    collect(&engine, &mut ledger, c, &[(InputField::CashToday, 1000)]);
    engine.advance_stage(&mut ledger).unwrap();
    assert_eq!(ledger.stage(), AuditStage::Allocation);

    // Carol sent an apology: her loan request is refused outright.
    let err = engine
        .set_input(&mut ledger, c, InputField::NewLoan, 500)
        .unwrap_err();
    assert!(matches!(err, EngineError::Eligibility(_)));
    assert_eq!(ledger.row(c).unwrap().input(InputField::NewLoan), 0);

    // Bob was late but may still borrow.
    engine.set_input(&mut ledger, b, InputField::NewLoan, 5000).unwrap();
    engine.set_input(&mut ledger, a, InputField::NewAdvance, 1000).unwrap();
    engine
        .set_guarantors(&mut ledger, b, vec!["ACC-001".into(), " ".into()])
        .unwrap();

    let advisory = engine.reconcile_bank(&ledger).unwrap();
    assert_eq!(advisory.external_borrowing, 0);
    assert_eq!(advisory.withdrawn, 0);
    assert_eq!(advisory.to_bank, 1000);

    let outcome = match engine.advance_stage(&mut ledger).unwrap() {
        StageOutcome::Finalized(outcome) => outcome,
        other => panic!("expected finalize, got {:?}", other),
    };
    assert_eq!(outcome.closing_reserve_balance, 1000);
    assert!(outcome.warnings.is_empty());
    assert!(ledger.stage().is_finalized());
    assert_eq!(ledger.closing_reserve_balance(), Some(1000));
    assert!(ledger.verify_balances());

    // Fines seeded from attendance.
    assert_eq!(ledger.row(b).unwrap().input(InputField::Fines), 50);
    assert_eq!(ledger.row(c).unwrap().input(InputField::Fines), 20);
    assert_eq!(ledger.row(b).unwrap().guarantors(), ["ACC-001".to_string()]);

    let stored = engine.gateway().period(group.id(), key(3, 2025)).unwrap();
    assert!(stored.header.is_finalized);
    assert_eq!(stored.rows.len(), 3);
}

#[test]
fn repayments_are_capped_at_the_balance_owed() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let mut engine = AuditEngine::new(simplified(), MemoryGateway::new());

    let mut jan = engine.open_period(&group, key(1, 2025)).unwrap().ledger;
    for (field, value) in [(InputField::LoanPrincipal, 1000), (InputField::AdvancePrincipal, 100)] {
        let err = engine.set_input(&mut jan, a, field, value).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::RepaymentExceedsBalance { balance: 0, .. })
        ));
    }
    engine.advance_stage(&mut jan).unwrap();
    engine.finalize_period(&mut jan).unwrap();

    let mut feb = engine.proceed_to_next_period(&group, &jan).unwrap().ledger;
    let row = engine.run_waterfall(&mut feb, a).unwrap();
    assert_eq!(row.loan_bf(), 0);
    assert_eq!(row.advance_bf(), 0);
    assert_eq!(row.loan_interest(), 0);
    assert_eq!(row.advance_interest(), 0);
    assert_eq!(row.savings_today(), 0);
}

#[test]
fn reserve_accumulates_and_tolerates_skipped_months() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let mut engine = AuditEngine::new(simplified(), MemoryGateway::new());

    let mut jan = engine.open_period(&group, key(1, 2025)).unwrap().ledger;
    collect(&engine, &mut jan, a, &[(InputField::CashToday, 1000)]);
    engine.advance_stage(&mut jan).unwrap();
    assert_eq!(engine.finalize_period(&mut jan).unwrap().closing_reserve_balance, 1000);

    // February never audited; March picks up January's balances and reserve.
    let opening = engine.open_period(&group, key(3, 2025)).unwrap();
    assert_eq!(opening.source, Some(key(1, 2025)));
    let mut mar = opening.ledger;
    assert_eq!(mar.row(a).unwrap().savings_bf(), 1000);

    collect(&engine, &mut mar, a, &[(InputField::CashToday, 200)]);
    engine.advance_stage(&mut mar).unwrap();
    engine.set_input(&mut mar, a, InputField::NewLoan, 2000).unwrap();

    let outcome = engine.finalize_period(&mut mar).unwrap();
    assert_eq!(outcome.reconciliation.opening_reserve, 1000);
    assert_eq!(outcome.reconciliation.withdrawn, 1000);
    assert_eq!(outcome.reconciliation.external_borrowing, 800);
    assert_eq!(outcome.closing_reserve_balance, 0);
    assert!(outcome.warnings.contains(&Warning::ReconciliationCritical {
        external_borrowing: 800
    }));
}

#[test]
fn resubmitting_a_period_replaces_it() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let mut engine = AuditEngine::new(simplified(), MemoryGateway::new());

    let mut first = engine.open_period(&group, key(5, 2025)).unwrap().ledger;
    collect(&engine, &mut first, a, &[(InputField::CashToday, 700)]);
    engine.advance_stage(&mut first).unwrap();
    let first_outcome = engine.finalize_period(&mut first).unwrap();

    // Same month again with corrected figures.
    let mut again = engine.open_period(&group, key(5, 2025)).unwrap().ledger;
    assert_eq!(again.row(a).unwrap().savings_bf(), 0);
    collect(&engine, &mut again, a, &[(InputField::CashToday, 900)]);
    engine.advance_stage(&mut again).unwrap();
    let second_outcome = engine.finalize_period(&mut again).unwrap();

    assert_eq!(first_outcome.period.id, second_outcome.period.id);
    assert_eq!(second_outcome.closing_reserve_balance, 900);
    assert_eq!(engine.gateway().len(), 1);
    assert_eq!(
        engine
            .gateway()
            .load_latest_finalized_reserve(group.id(), key(6, 2025))
            .unwrap(),
        900
    );
    let stored = engine.gateway().period(group.id(), key(5, 2025)).unwrap();
    assert_eq!(stored.rows[0].savings_cf(), 900);
}

#[test]
fn december_rolls_into_january() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let mut engine = AuditEngine::new(simplified(), MemoryGateway::new());

    let mut dec = engine.open_period(&group, key(12, 2024)).unwrap().ledger;
    collect(&engine, &mut dec, a, &[(InputField::CashToday, 250)]);
    engine.advance_stage(&mut dec).unwrap();
    engine.advance_stage(&mut dec).unwrap();

    let jan = engine.proceed_to_next_period(&group, &dec).unwrap().ledger;
    assert_eq!(jan.period(), key(1, 2025));
    assert_eq!(jan.stage(), AuditStage::Collection);
    assert_eq!(jan.row(a).unwrap().savings_bf(), 250);
    assert_eq!(jan.row(a).unwrap().attendance(), Some(AttendanceStatus::Present));
}

#[test]
fn nearest_five_policy_applies_everywhere() {
    let mut group = Group::new("Sunrise Chama");
    let a = group.add_member("Alice", "ACC-001").unwrap();
    let config = EngineConfig {
        rounding: RoundingPolicy::NearestFive,
        workflow: WorkflowVariant::Simplified,
        ..Default::default()
    };
    let mut engine = AuditEngine::new(config, MemoryGateway::new());

    let mut jan = engine.open_period(&group, key(1, 2025)).unwrap().ledger;
    engine.advance_stage(&mut jan).unwrap();
    engine.set_input(&mut jan, a, InputField::NewLoan, 200).unwrap();
    engine.set_input(&mut jan, a, InputField::NewAdvance, 125).unwrap();
    engine.finalize_period(&mut jan).unwrap();

    let mut feb = engine.proceed_to_next_period(&group, &jan).unwrap().ledger;
    let row = engine.run_waterfall(&mut feb, a).unwrap();
    // 200 * 1.5% = 3 -> 5
    assert_eq!(row.loan_interest(), 5);
    assert_eq!(row.loan_bf(), 200);
}

#[test]
fn ledger_serializes_for_review() {
    let mut group = Group::new("Sunrise Chama");
    group.add_member("Alice", "ACC-001").unwrap();
    let engine = AuditEngine::new(EngineConfig::default(), MemoryGateway::new());
    let ledger = engine.open_period(&group, key(1, 2025)).unwrap().ledger;

    let json = serde_json::to_value(&ledger).unwrap();
    assert_eq!(json["stage"], "ATTENDANCE_CHECK");
    assert_eq!(json["period"]["month"], 1);
    assert!(json["rows"][0].get("savings_bf").is_some());
}
