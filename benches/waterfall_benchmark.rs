use chama_ledger::calculation::waterfall::{Waterfall, WaterfallInputs};
use chama_ledger::config::EngineConfig;
use chama_ledger::persistence::memory::MemoryGateway;
use chama_ledger::simulation::cohort::{generate_session, CohortConfig};
use chama_ledger::workflow::engine::AuditEngine;
use chama_ledger::workflow::session::run_session;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_waterfall_single_row(c: &mut Criterion) {
    let waterfall = Waterfall::default();
    let inputs = WaterfallInputs {
        savings_bf: 120_000,
        loan_bf: 45_000,
        advance_bf: 5_000,
        cash_today: 6_000,
        fines: 50,
        loan_principal: 2_500,
        advance_principal: 1_000,
        new_loan: 0,
    };

    c.bench_function("waterfall_single_row", |b| {
        b.iter(|| waterfall.compute(black_box(&inputs)))
    });
}

fn bench_session(c: &mut Criterion, members: usize) {
    let config = CohortConfig {
        member_count: members,
        ..Default::default()
    };
    let session = generate_session(&config);

    c.bench_function(&format!("session_{}_members", members), |b| {
        b.iter(|| {
            let mut engine = AuditEngine::new(EngineConfig::default(), MemoryGateway::new());
            run_session(&mut engine, black_box(&session))
        })
    });
}

fn bench_session_20_members(c: &mut Criterion) {
    bench_session(c, 20);
}

fn bench_session_200_members(c: &mut Criterion) {
    bench_session(c, 200);
}

criterion_group!(
    benches,
    bench_waterfall_single_row,
    bench_session_20_members,
    bench_session_200_members
);
criterion_main!(benches);
