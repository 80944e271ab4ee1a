//! Batch runs of a whole period from a session file.
//!
//! A session file lists the group roster and, per account number, the
//! figures captured at the meeting. Amounts may be numbers or text; text
//! goes through the same lenient parsing as hand-entered figures.

use crate::core::ledger::{AttendanceStatus, InputField, LedgerTotals, PeriodLedger};
use crate::core::member::{Group, MemberId};
use crate::core::period::{AuditStage, PeriodKey};
use crate::error::{EngineError, ValidationError, Warning};
use crate::persistence::gateway::PersistenceGateway;
use crate::workflow::engine::{AuditEngine, FinalizeOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Figures captured for one member at the meeting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberEntry {
    pub account_number: String,
    pub attendance: Option<AttendanceStatus>,
    pub cash_today: Option<Value>,
    /// Overrides the fine seeded from attendance when present.
    pub fines: Option<Value>,
    pub loan_principal: Option<Value>,
    pub advance_principal: Option<Value>,
    pub new_loan: Option<Value>,
    pub new_advance: Option<Value>,
    pub savings_withdrawal: Option<Value>,
    pub guarantors: Vec<String>,
}

impl MemberEntry {
    fn amount(&self, field: InputField) -> Option<&Value> {
        match field {
            InputField::CashToday => self.cash_today.as_ref(),
            InputField::Fines => self.fines.as_ref(),
            InputField::LoanPrincipal => self.loan_principal.as_ref(),
            InputField::AdvancePrincipal => self.advance_principal.as_ref(),
            InputField::NewLoan => self.new_loan.as_ref(),
            InputField::NewAdvance => self.new_advance.as_ref(),
            InputField::SavingsWithdrawal => self.savings_withdrawal.as_ref(),
        }
    }
}

/// A complete period of input for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub group: Group,
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub entries: Vec<MemberEntry>,
}

/// Everything produced by running a session to finalization.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub ledger: PeriodLedger,
    pub totals: LedgerTotals,
    pub finalize: FinalizeOutcome,
    /// Opening, input and finalize warnings in the order raised.
    pub warnings: Vec<Warning>,
}

const COLLECTION_FIELDS: [InputField; 4] = [
    InputField::CashToday,
    InputField::Fines,
    InputField::LoanPrincipal,
    InputField::AdvancePrincipal,
];

const ALLOCATION_FIELDS: [InputField; 3] = [
    InputField::NewLoan,
    InputField::NewAdvance,
    InputField::SavingsWithdrawal,
];

/// Open, fill and finalize one period from a session file.
pub fn run_session<G: PersistenceGateway>(
    engine: &mut AuditEngine<G>,
    session: &SessionFile,
) -> Result<SessionReport, EngineError> {
    let period = PeriodKey::new(session.month, session.year)?;
    let group = &session.group;

    let entries = session
        .entries
        .iter()
        .map(|e| {
            group
                .member_by_account(&e.account_number)
                .map(|m| (m.id(), e))
                .ok_or_else(|| ValidationError::UnknownAccount(e.account_number.clone()))
        })
        .collect::<Result<Vec<(MemberId, &MemberEntry)>, _>>()?;

    let opening = engine.open_period(group, period)?;
    let mut ledger = opening.ledger;
    let mut warnings = opening.warnings;

    if ledger.stage() == AuditStage::AttendanceCheck {
        for (member, entry) in &entries {
            if let Some(status) = entry.attendance {
                engine.record_attendance(&mut ledger, *member, status)?;
            }
        }
        engine.advance_stage(&mut ledger)?;
    }

    apply_fields(engine, &mut ledger, &entries, &COLLECTION_FIELDS, &mut warnings)?;
    for member in ledger.member_ids() {
        engine.run_waterfall(&mut ledger, member)?;
    }
    engine.advance_stage(&mut ledger)?;

    apply_fields(engine, &mut ledger, &entries, &ALLOCATION_FIELDS, &mut warnings)?;
    for (member, entry) in &entries {
        if !entry.guarantors.is_empty() {
            engine.set_guarantors(&mut ledger, *member, entry.guarantors.clone())?;
        }
    }

    let finalize = engine.finalize_period(&mut ledger)?;
    warnings.extend(
        finalize
            .warnings
            .iter()
            .filter(|w| !matches!(w, Warning::CapacityWarning { .. }))
            .cloned(),
    );

    Ok(SessionReport {
        totals: ledger.totals(),
        ledger,
        finalize,
        warnings,
    })
}

fn apply_fields<G: PersistenceGateway>(
    engine: &AuditEngine<G>,
    ledger: &mut PeriodLedger,
    entries: &[(MemberId, &MemberEntry)],
    fields: &[InputField],
    warnings: &mut Vec<Warning>,
) -> Result<(), EngineError> {
    for (member, entry) in entries {
        for field in fields {
            if let Some(value) = entry.amount(*field) {
                let text = raw_text(value);
                if let Some(w) = engine.set_input_text(ledger, *member, *field, &text)? {
                    warnings.push(w);
                }
            }
        }
    }
    Ok(())
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
