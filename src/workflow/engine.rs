use crate::calculation::waterfall::{parse_signed_amount, MAX_AMOUNT};
use crate::config::{EngineConfig, WithdrawalPolicy};
use crate::core::ledger::{AttendanceStatus, ClosingBalances, InputField, LedgerRow, PeriodLedger};
use crate::core::member::{Group, MemberId};
use crate::core::period::{AuditPeriod, AuditStage, PeriodKey, WorkflowVariant};
use crate::error::{AttendanceLabel, EligibilityError, EngineError, ValidationError, Warning};
use crate::persistence::gateway::PersistenceGateway;
use crate::reconciliation::bank::{BankReconciler, BankReconciliation, CashFlow};
use crate::reconciliation::carry_forward::CarryForwardMapper;
use log::{debug, info, warn};
use serde::Serialize;

/// A freshly opened period ledger.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodOpening {
    pub ledger: PeriodLedger,
    /// The finalized period the balances were carried from, if any.
    pub source: Option<PeriodKey>,
    pub warnings: Vec<Warning>,
}

/// Result of a successful finalize.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
    pub period: AuditPeriod,
    pub closing_reserve_balance: i64,
    pub reconciliation: BankReconciliation,
    pub warnings: Vec<Warning>,
}

/// Result of [`AuditEngine::advance_stage`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Advanced { from: AuditStage, to: AuditStage },
    Finalized(FinalizeOutcome),
}

/// Drives a period ledger through its audit workflow.
///
/// Every mutation of a [`PeriodLedger`] goes through this type. Each
/// operation checks the current stage and its preconditions before it
/// touches the ledger, so a rejected call leaves the ledger unchanged.
///
/// The engine holds no ledger state of its own; a period is edited by one
/// coordinator at a time and only persisted on finalize.
pub struct AuditEngine<G: PersistenceGateway> {
    config: EngineConfig,
    gateway: G,
}

impl<G: PersistenceGateway> AuditEngine<G> {
    pub fn new(config: EngineConfig, gateway: G) -> Self {
        Self { config, gateway }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Open a period for the group's current roster.
    ///
    /// Balances come from the latest finalized period before this one; a
    /// group with no finalized history starts from zero.
    pub fn open_period(&self, group: &Group, period: PeriodKey) -> Result<PeriodOpening, EngineError> {
        match self.gateway.load_prior_period_closing(group.id(), period)? {
            Some(prior) => {
                info!(
                    "opening {} for {}: carrying forward from {}",
                    period,
                    group.name(),
                    prior.period
                );
                Ok(self.carry_forward(group, period, &prior.balances, Some(prior.period)))
            }
            None => {
                info!("opening {} for {}: fresh cohort", period, group.name());
                let rows = CarryForwardMapper::fresh(group.members());
                Ok(PeriodOpening {
                    ledger: self.start(group, period, rows),
                    source: None,
                    warnings: Vec::new(),
                })
            }
        }
    }

    /// Open the month after a just-finalized period.
    ///
    /// Balances are read back from storage, so the period must have been
    /// committed by [`finalize_period`](Self::finalize_period).
    pub fn proceed_to_next_period(
        &self,
        group: &Group,
        finalized: &PeriodLedger,
    ) -> Result<PeriodOpening, EngineError> {
        if !finalized.stage().is_finalized() {
            return Err(EngineError::InvalidTransition {
                stage: finalized.stage(),
                action: "proceed to the next period",
            });
        }
        if finalized.group_id() != group.id() {
            return Err(ValidationError::GroupMismatch.into());
        }
        let next = finalized.period().next();
        let prior = self
            .gateway
            .load_prior_period_closing(group.id(), next)?
            .filter(|p| p.period == finalized.period())
            .ok_or(ValidationError::PeriodNotPersisted(finalized.period()))?;
        info!("proceeding from {} to {}", prior.period, next);
        Ok(self.carry_forward(group, next, &prior.balances, Some(prior.period)))
    }

    pub fn record_attendance(
        &self,
        ledger: &mut PeriodLedger,
        member: MemberId,
        status: AttendanceStatus,
    ) -> Result<(), EngineError> {
        if ledger.stage() != AuditStage::AttendanceCheck {
            return Err(ValidationError::AttendanceClosed(ledger.stage()).into());
        }
        ledger.row_mut(member)?.set_attendance(status);
        debug!("attendance {} -> {}", member, status);
        Ok(())
    }

    /// Write a user-editable amount.
    ///
    /// Negative amounts degrade to zero for collection fields and are
    /// rejected for disbursements. Amounts above [`MAX_AMOUNT`] and
    /// repayments larger than the balance brought forward are rejected.
    /// A withdrawal larger than the member's available savings is warned
    /// about or blocked per configuration.
    pub fn set_input(
        &self,
        ledger: &mut PeriodLedger,
        member: MemberId,
        field: InputField,
        value: i64,
    ) -> Result<Option<Warning>, EngineError> {
        let stage = ledger.stage();
        if !field.editable_in(stage) {
            return Err(ValidationError::StageMismatch { field, stage }.into());
        }
        let row = ledger.row_mut(member)?;

        let value = if value < 0 {
            if field.is_disbursement() {
                return Err(ValidationError::NegativeDisbursement { field, value }.into());
            }
            warn!("{} for {} was negative ({}), recorded as 0", field, member, value);
            0
        } else {
            value
        };
        if value > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge {
                field,
                value,
                max: MAX_AMOUNT,
            }
            .into());
        }

        let balance = match field {
            InputField::LoanPrincipal => Some(row.loan_bf()),
            InputField::AdvancePrincipal => Some(row.advance_bf()),
            _ => None,
        };
        if let Some(balance) = balance.filter(|b| value > *b) {
            return Err(ValidationError::RepaymentExceedsBalance {
                field,
                requested: value,
                balance,
            }
            .into());
        }

        if matches!(field, InputField::NewLoan | InputField::NewAdvance) && value > 0 {
            ensure_eligible(row, field)?;
        }

        let mut warning = None;
        if field == InputField::SavingsWithdrawal {
            let available = self.available_savings(row);
            if value > available {
                match self.config.withdrawal_policy {
                    WithdrawalPolicy::Block => {
                        return Err(ValidationError::WithdrawalExceedsSavings {
                            requested: value,
                            available,
                        }
                        .into());
                    }
                    WithdrawalPolicy::Warn => {
                        let w = Warning::CapacityWarning {
                            member,
                            requested: value,
                            available,
                        };
                        warn!("{}", w);
                        warning = Some(w);
                    }
                }
            }
        }

        row.set_input(field, value);
        debug!("{} {} = {}", member, field, value);
        Ok(warning)
    }

    /// Write an amount from hand-entered text.
    ///
    /// Blank text counts as zero. Malformed text counts as zero too, except
    /// for disbursements, which must be a valid non-negative whole number.
    pub fn set_input_text(
        &self,
        ledger: &mut PeriodLedger,
        member: MemberId,
        field: InputField,
        raw: &str,
    ) -> Result<Option<Warning>, EngineError> {
        if raw.trim().is_empty() {
            return self.set_input(ledger, member, field, 0);
        }
        match parse_signed_amount(raw) {
            Some(value) => self.set_input(ledger, member, field, value),
            None if field.is_disbursement() => {
                let stage = ledger.stage();
                if !field.editable_in(stage) {
                    return Err(ValidationError::StageMismatch { field, stage }.into());
                }
                Err(ValidationError::NonNumericDisbursement {
                    field,
                    raw: raw.to_string(),
                }
                .into())
            }
            None => {
                warn!("{} for {}: unreadable amount {:?}, recorded as 0", field, member, raw);
                self.set_input(ledger, member, field, 0)
            }
        }
    }

    /// Record free-text guarantor references for a member's loan.
    pub fn set_guarantors(
        &self,
        ledger: &mut PeriodLedger,
        member: MemberId,
        guarantors: Vec<String>,
    ) -> Result<(), EngineError> {
        if ledger.stage() != AuditStage::Allocation {
            return Err(ValidationError::GuarantorsClosed(ledger.stage()).into());
        }
        let cleaned = guarantors
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        ledger.row_mut(member)?.set_guarantors(cleaned);
        Ok(())
    }

    /// Recompute one member's interest, savings and closing balances.
    pub fn run_waterfall<'a>(
        &self,
        ledger: &'a mut PeriodLedger,
        member: MemberId,
    ) -> Result<&'a LedgerRow, EngineError> {
        if ledger.stage().is_finalized() {
            return Err(EngineError::InvalidTransition {
                stage: ledger.stage(),
                action: "recalculate a finalized row",
            });
        }
        let row = ledger.row_mut(member)?;
        self.compute_row(row);
        Ok(row)
    }

    /// Move the period to its next stage after checking that transition's
    /// preconditions. From ALLOCATION this finalizes the period.
    pub fn advance_stage(&mut self, ledger: &mut PeriodLedger) -> Result<StageOutcome, EngineError> {
        let from = ledger.stage();
        match from {
            AuditStage::AttendanceCheck => {
                let missing = ledger
                    .rows()
                    .iter()
                    .filter(|r| r.attendance().is_none())
                    .count();
                if missing > 0 {
                    return Err(ValidationError::AttendanceIncomplete { missing }.into());
                }
                let fines = self.config.fines;
                for row in ledger.rows_mut() {
                    if let Some(status) = row.attendance() {
                        row.set_input(InputField::Fines, fines.fine_for(status));
                    }
                }
            }
            AuditStage::Collection => check_eligibility(ledger)?,
            AuditStage::Allocation => {
                return self.finalize_period(ledger).map(StageOutcome::Finalized);
            }
            AuditStage::Finalized => {
                return Err(EngineError::InvalidTransition {
                    stage: from,
                    action: "advance a finalized period",
                });
            }
        }

        let to = from.successor().unwrap_or(from);
        ledger.set_stage(to);
        info!("{}: {} -> {}", ledger.period(), from, to);
        Ok(StageOutcome::Advanced { from, to })
    }

    /// Close the period: recompute every row, reconcile the bank and
    /// persist the full row set together with the closing reserve.
    ///
    /// Nothing is marked finalized unless the gateway commits.
    pub fn finalize_period(&mut self, ledger: &mut PeriodLedger) -> Result<FinalizeOutcome, EngineError> {
        if ledger.stage() != AuditStage::Allocation {
            return Err(EngineError::InvalidTransition {
                stage: ledger.stage(),
                action: "finalize",
            });
        }
        check_eligibility(ledger)?;

        for row in ledger.rows_mut() {
            self.compute_row(row);
        }

        let mut warnings: Vec<Warning> = ledger
            .rows()
            .iter()
            .filter(|r| r.input(InputField::SavingsWithdrawal) > r.withdrawable_savings())
            .map(|r| Warning::CapacityWarning {
                member: r.member_id(),
                requested: r.input(InputField::SavingsWithdrawal),
                available: r.withdrawable_savings(),
            })
            .collect();

        let reconciliation = self.reconcile(ledger)?;
        if reconciliation.needs_external_borrowing() {
            warnings.push(Warning::ReconciliationCritical {
                external_borrowing: reconciliation.external_borrowing,
            });
        }
        for w in &warnings {
            warn!("{}: {}", ledger.period(), w);
        }

        let period = self.gateway.save_period(
            ledger.group_id(),
            ledger.period(),
            ledger.rows(),
            reconciliation.new_reserve,
        )?;

        ledger.set_closing_reserve(reconciliation.new_reserve);
        ledger.set_stage(AuditStage::Finalized);
        info!(
            "{} finalized: {} rows, closing reserve {}",
            ledger.period(),
            ledger.len(),
            reconciliation.new_reserve
        );

        Ok(FinalizeOutcome {
            period,
            closing_reserve_balance: reconciliation.new_reserve,
            reconciliation,
            warnings,
        })
    }

    /// Advisory bank reconciliation for the period as currently entered.
    pub fn reconcile_bank(&self, ledger: &PeriodLedger) -> Result<BankReconciliation, EngineError> {
        match ledger.stage() {
            AuditStage::Allocation | AuditStage::Finalized => self.reconcile(ledger),
            stage => Err(EngineError::InvalidTransition {
                stage,
                action: "reconcile the bank",
            }),
        }
    }

    fn reconcile(&self, ledger: &PeriodLedger) -> Result<BankReconciliation, EngineError> {
        let opening = self
            .gateway
            .load_latest_finalized_reserve(ledger.group_id(), ledger.period())?;
        Ok(BankReconciler::reconcile(opening, &CashFlow::from_ledger(ledger)))
    }

    fn carry_forward(
        &self,
        group: &Group,
        period: PeriodKey,
        closing: &[ClosingBalances],
        source: Option<PeriodKey>,
    ) -> PeriodOpening {
        let outcome = CarryForwardMapper::map(closing, group.members());
        let warnings: Vec<Warning> = outcome
            .departed
            .into_iter()
            .filter(|b| !b.is_zero())
            .map(|balances| Warning::DepartedMember { balances })
            .collect();
        for w in &warnings {
            warn!("{}: {}", period, w);
        }
        PeriodOpening {
            ledger: self.start(group, period, outcome.rows),
            source,
            warnings,
        }
    }

    fn start(&self, group: &Group, period: PeriodKey, mut rows: Vec<LedgerRow>) -> PeriodLedger {
        if self.config.workflow == WorkflowVariant::Simplified {
            for row in &mut rows {
                row.set_attendance(AttendanceStatus::Present);
            }
        }
        PeriodLedger::new(group.id(), period, AuditStage::initial(self.config.workflow), rows)
    }

    fn compute_row(&self, row: &mut LedgerRow) {
        let result = self.config.waterfall().compute(&row.waterfall_inputs());
        debug!(
            "waterfall {}: interest {}/{} savings_today {} savings_cf {}",
            row.member_id(),
            result.loan_interest,
            result.advance_interest,
            result.savings_today,
            result.savings_cf
        );
        row.apply(&result);
    }

    fn available_savings(&self, row: &LedgerRow) -> i64 {
        let result = self.config.waterfall().compute(&row.waterfall_inputs());
        row.savings_bf() + result.savings_today
    }
}

fn ensure_eligible(row: &LedgerRow, field: InputField) -> Result<(), EligibilityError> {
    match row.attendance() {
        Some(status) if status.may_receive_disbursement() => Ok(()),
        status => Err(EligibilityError {
            member: row.member_id(),
            status: AttendanceLabel(status),
            field,
        }),
    }
}

/// Reject the ledger if any loan or advance goes to an ineligible member.
fn check_eligibility(ledger: &PeriodLedger) -> Result<(), EngineError> {
    let errors: Vec<EligibilityError> = ledger
        .rows()
        .iter()
        .flat_map(|row| {
            [InputField::NewLoan, InputField::NewAdvance]
                .into_iter()
                .filter(|f| row.input(*f) > 0)
                .filter_map(|f| ensure_eligible(row, f).err())
                .collect::<Vec<_>>()
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Eligibility(errors))
    }
}
