use crate::core::ledger::{LedgerTotals, PeriodLedger};
use serde::{Deserialize, Serialize};

/// Group-wide cash movements of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CashFlow {
    pub cash_collected: i64,
    pub new_loans: i64,
    pub new_advances: i64,
    pub withdrawals: i64,
}

impl CashFlow {
    pub fn from_totals(totals: &LedgerTotals) -> Self {
        Self {
            cash_collected: totals.cash_today,
            new_loans: totals.new_loan,
            new_advances: totals.new_advance,
            withdrawals: totals.savings_withdrawal,
        }
    }

    pub fn from_ledger(ledger: &PeriodLedger) -> Self {
        Self::from_totals(&ledger.totals())
    }

    pub fn money_out(&self) -> i64 {
        self.new_loans + self.new_advances + self.withdrawals
    }
}

/// Where the period's cash went, and the resulting reserve.
///
/// At most one side is active: either a surplus is banked (`to_bank`),
/// or a shortfall is covered from the reserve (`withdrawn`) and, past
/// that, from outside the group (`external_borrowing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankReconciliation {
    pub opening_reserve: i64,
    pub cash_collected: i64,
    pub money_out: i64,
    pub to_bank: i64,
    pub withdrawn: i64,
    pub external_borrowing: i64,
    pub new_reserve: i64,
}

impl BankReconciliation {
    /// The reserve could not cover the period's disbursements.
    #[must_use]
    pub fn needs_external_borrowing(&self) -> bool {
        self.external_borrowing > 0
    }
}

impl std::fmt::Display for BankReconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bank Reconciliation ===")?;
        writeln!(f, "Opening Reserve:    {}", self.opening_reserve)?;
        writeln!(f, "Cash Collected:     {}", self.cash_collected)?;
        writeln!(f, "Money Out:          {}", self.money_out)?;
        writeln!(f, "To Bank:            {}", self.to_bank)?;
        writeln!(f, "Withdrawn:          {}", self.withdrawn)?;
        writeln!(f, "External Borrowing: {}", self.external_borrowing)?;
        writeln!(f, "New Reserve:        {}", self.new_reserve)
    }
}

pub struct BankReconciler;

impl BankReconciler {
    /// Settle a period's cash gap against the group reserve.
    ///
    /// # Algorithm
    ///
    /// 1. gap = cash collected - (new loans + new advances + withdrawals).
    /// 2. A surplus goes to the bank and grows the reserve.
    /// 3. A deficit draws down the reserve; whatever the reserve cannot
    ///    cover is external borrowing and the reserve ends at zero.
    pub fn reconcile(opening_reserve: i64, flow: &CashFlow) -> BankReconciliation {
        let opening_reserve = opening_reserve.max(0);
        let money_out = flow.money_out();
        let gap = flow.cash_collected - money_out;

        let (to_bank, withdrawn, external_borrowing, new_reserve) = if gap >= 0 {
            (gap, 0, 0, opening_reserve + gap)
        } else {
            let deficit = -gap;
            if opening_reserve >= deficit {
                (0, deficit, 0, opening_reserve - deficit)
            } else {
                (0, opening_reserve, deficit - opening_reserve, 0)
            }
        };

        BankReconciliation {
            opening_reserve,
            cash_collected: flow.cash_collected,
            money_out,
            to_bank,
            withdrawn,
            external_borrowing,
            new_reserve,
        }
    }
}
