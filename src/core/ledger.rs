use crate::calculation::waterfall::{WaterfallInputs, WaterfallResult};
use crate::core::member::{GroupId, Member, MemberId};
use crate::core::period::{AuditStage, PeriodKey};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A member's attendance at the period's meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Apology,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::Apology => "apology",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "present" => Some(Self::Present),
            "late" => Some(Self::Late),
            "absent" => Some(Self::Absent),
            "apology" => Some(Self::Apology),
            _ => None,
        }
    }

    /// Only members who attended may receive a loan or advance.
    #[must_use]
    pub fn may_receive_disbursement(&self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-editable monetary field of a ledger row.
///
/// Brought-forward and derived fields are deliberately absent: they are
/// written only by carry-forward and the waterfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    CashToday,
    Fines,
    LoanPrincipal,
    AdvancePrincipal,
    NewLoan,
    NewAdvance,
    SavingsWithdrawal,
}

impl InputField {
    pub const ALL: [InputField; 7] = [
        Self::CashToday,
        Self::Fines,
        Self::LoanPrincipal,
        Self::AdvancePrincipal,
        Self::NewLoan,
        Self::NewAdvance,
        Self::SavingsWithdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashToday => "cash_today",
            Self::Fines => "fines",
            Self::LoanPrincipal => "loan_principal",
            Self::AdvancePrincipal => "advance_principal",
            Self::NewLoan => "new_loan",
            Self::NewAdvance => "new_advance",
            Self::SavingsWithdrawal => "savings_withdrawal",
        }
    }

    /// Money paid out of the group to a member.
    #[must_use]
    pub fn is_disbursement(&self) -> bool {
        matches!(
            self,
            Self::NewLoan | Self::NewAdvance | Self::SavingsWithdrawal
        )
    }

    /// Whether this field may be written while the period is in `stage`.
    #[must_use]
    pub fn editable_in(&self, stage: AuditStage) -> bool {
        match stage {
            AuditStage::Collection => !self.is_disbursement(),
            AuditStage::Allocation => self.is_disbursement(),
            AuditStage::AttendanceCheck | AuditStage::Finalized => false,
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opening balances of a member for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpeningBalances {
    pub savings_bf: i64,
    pub loan_bf: i64,
    pub advance_bf: i64,
}

/// Closing balances of a member at the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingBalances {
    pub member_id: MemberId,
    pub savings_cf: i64,
    pub loan_cf: i64,
    pub advance_cf: i64,
}

impl ClosingBalances {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.savings_cf == 0 && self.loan_cf == 0 && self.advance_cf == 0
    }
}

/// One member's row in a period ledger. All amounts are minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    member_id: MemberId,
    member_name: String,
    attendance: Option<AttendanceStatus>,

    savings_bf: i64,
    loan_bf: i64,
    advance_bf: i64,

    cash_today: i64,
    fines: i64,
    loan_principal: i64,
    advance_principal: i64,
    new_loan: i64,
    new_advance: i64,
    savings_withdrawal: i64,

    loan_interest: i64,
    advance_interest: i64,
    savings_today: i64,
    savings_cf: i64,
    loan_cf: i64,
    advance_cf: i64,

    #[serde(default)]
    guarantors: Vec<String>,
}

impl LedgerRow {
    /// An opening row: brought-forward balances set, everything else zero.
    pub(crate) fn opening(member: &Member, balances: OpeningBalances) -> Self {
        Self {
            member_id: member.id(),
            member_name: member.name().to_string(),
            attendance: None,
            savings_bf: balances.savings_bf,
            loan_bf: balances.loan_bf,
            advance_bf: balances.advance_bf,
            cash_today: 0,
            fines: 0,
            loan_principal: 0,
            advance_principal: 0,
            new_loan: 0,
            new_advance: 0,
            savings_withdrawal: 0,
            loan_interest: 0,
            advance_interest: 0,
            savings_today: 0,
            savings_cf: 0,
            loan_cf: 0,
            advance_cf: 0,
            guarantors: Vec::new(),
        }
    }

    // --- Accessors ---

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn attendance(&self) -> Option<AttendanceStatus> {
        self.attendance
    }

    pub fn savings_bf(&self) -> i64 {
        self.savings_bf
    }

    pub fn loan_bf(&self) -> i64 {
        self.loan_bf
    }

    pub fn advance_bf(&self) -> i64 {
        self.advance_bf
    }

    pub fn loan_interest(&self) -> i64 {
        self.loan_interest
    }

    pub fn advance_interest(&self) -> i64 {
        self.advance_interest
    }

    pub fn savings_today(&self) -> i64 {
        self.savings_today
    }

    pub fn savings_cf(&self) -> i64 {
        self.savings_cf
    }

    pub fn loan_cf(&self) -> i64 {
        self.loan_cf
    }

    pub fn advance_cf(&self) -> i64 {
        self.advance_cf
    }

    pub fn guarantors(&self) -> &[String] {
        &self.guarantors
    }

    /// Current value of a user-editable field.
    pub fn input(&self, field: InputField) -> i64 {
        match field {
            InputField::CashToday => self.cash_today,
            InputField::Fines => self.fines,
            InputField::LoanPrincipal => self.loan_principal,
            InputField::AdvancePrincipal => self.advance_principal,
            InputField::NewLoan => self.new_loan,
            InputField::NewAdvance => self.new_advance,
            InputField::SavingsWithdrawal => self.savings_withdrawal,
        }
    }

    pub fn opening_balances(&self) -> OpeningBalances {
        OpeningBalances {
            savings_bf: self.savings_bf,
            loan_bf: self.loan_bf,
            advance_bf: self.advance_bf,
        }
    }

    pub fn closing_balances(&self) -> ClosingBalances {
        ClosingBalances {
            member_id: self.member_id,
            savings_cf: self.savings_cf,
            loan_cf: self.loan_cf,
            advance_cf: self.advance_cf,
        }
    }

    pub fn waterfall_inputs(&self) -> WaterfallInputs {
        WaterfallInputs {
            savings_bf: self.savings_bf,
            loan_bf: self.loan_bf,
            advance_bf: self.advance_bf,
            cash_today: self.cash_today,
            fines: self.fines,
            loan_principal: self.loan_principal,
            advance_principal: self.advance_principal,
            new_loan: self.new_loan,
        }
    }

    /// Savings a member could withdraw after today's movement.
    pub fn withdrawable_savings(&self) -> i64 {
        self.savings_bf + self.savings_today
    }

    /// Whether any loan or advance has been requested for this member.
    #[must_use]
    pub fn has_credit_request(&self) -> bool {
        self.new_loan > 0 || self.new_advance > 0
    }

    /// Check `CF = BF + movement` for every balance type.
    #[must_use]
    pub fn balances_hold(&self) -> bool {
        let deductions = self.fines
            + self.loan_principal
            + self.loan_interest
            + self.advance_principal
            + self.advance_interest;
        self.savings_today == self.cash_today - deductions
            && self.savings_cf == self.savings_bf + self.savings_today
            && self.loan_cf == self.loan_bf - self.loan_principal + self.new_loan
            && self.advance_cf == self.advance_bf - self.advance_principal
    }

    // --- Mutation (engine only) ---

    pub(crate) fn set_input(&mut self, field: InputField, value: i64) {
        let slot = match field {
            InputField::CashToday => &mut self.cash_today,
            InputField::Fines => &mut self.fines,
            InputField::LoanPrincipal => &mut self.loan_principal,
            InputField::AdvancePrincipal => &mut self.advance_principal,
            InputField::NewLoan => &mut self.new_loan,
            InputField::NewAdvance => &mut self.new_advance,
            InputField::SavingsWithdrawal => &mut self.savings_withdrawal,
        };
        *slot = value;
    }

    pub(crate) fn set_attendance(&mut self, status: AttendanceStatus) {
        self.attendance = Some(status);
    }

    pub(crate) fn set_guarantors(&mut self, guarantors: Vec<String>) {
        self.guarantors = guarantors;
    }

    pub(crate) fn apply(&mut self, result: &WaterfallResult) {
        self.advance_interest = result.advance_interest;
        self.loan_interest = result.loan_interest;
        self.savings_today = result.savings_today;
        self.savings_cf = result.savings_cf;
        self.loan_cf = result.loan_cf;
        self.advance_cf = result.advance_cf;
    }
}

/// Column sums across every row of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub cash_today: i64,
    pub fines: i64,
    pub savings_bf: i64,
    pub savings_today: i64,
    pub savings_cf: i64,
    pub loan_bf: i64,
    pub loan_principal: i64,
    pub loan_interest: i64,
    pub loan_cf: i64,
    pub advance_bf: i64,
    pub advance_principal: i64,
    pub advance_interest: i64,
    pub advance_cf: i64,
    pub new_loan: i64,
    pub new_advance: i64,
    pub savings_withdrawal: i64,
}

/// The working ledger of one period: a row per rostered member plus stage.
///
/// All mutation goes through the workflow engine; callers only read.
/// Serialises for review but cannot be deserialised.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodLedger {
    group_id: GroupId,
    period: PeriodKey,
    stage: AuditStage,
    rows: Vec<LedgerRow>,
    closing_reserve_balance: Option<i64>,
}

impl PeriodLedger {
    pub(crate) fn new(
        group_id: GroupId,
        period: PeriodKey,
        stage: AuditStage,
        rows: Vec<LedgerRow>,
    ) -> Self {
        Self {
            group_id,
            period,
            stage,
            rows,
            closing_reserve_balance: None,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn period(&self) -> PeriodKey {
        self.period
    }

    pub fn stage(&self) -> AuditStage {
        self.stage
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, member: MemberId) -> Option<&LedgerRow> {
        self.rows.iter().find(|r| r.member_id == member)
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.rows.iter().map(|r| r.member_id).collect()
    }

    /// Recorded only once the period is finalized.
    pub fn closing_reserve_balance(&self) -> Option<i64> {
        self.closing_reserve_balance
    }

    pub fn closing_balances(&self) -> Vec<ClosingBalances> {
        self.rows.iter().map(LedgerRow::closing_balances).collect()
    }

    pub fn totals(&self) -> LedgerTotals {
        self.rows.iter().fold(LedgerTotals::default(), |mut t, r| {
            t.cash_today += r.cash_today;
            t.fines += r.fines;
            t.savings_bf += r.savings_bf;
            t.savings_today += r.savings_today;
            t.savings_cf += r.savings_cf;
            t.loan_bf += r.loan_bf;
            t.loan_principal += r.loan_principal;
            t.loan_interest += r.loan_interest;
            t.loan_cf += r.loan_cf;
            t.advance_bf += r.advance_bf;
            t.advance_principal += r.advance_principal;
            t.advance_interest += r.advance_interest;
            t.advance_cf += r.advance_cf;
            t.new_loan += r.new_loan;
            t.new_advance += r.new_advance;
            t.savings_withdrawal += r.savings_withdrawal;
            t
        })
    }

    /// Verify that every row satisfies its carry-forward identities.
    pub fn verify_balances(&self) -> bool {
        self.rows.iter().all(LedgerRow::balances_hold)
    }

    pub(crate) fn row_mut(&mut self, member: MemberId) -> Result<&mut LedgerRow, ValidationError> {
        self.rows
            .iter_mut()
            .find(|r| r.member_id == member)
            .ok_or(ValidationError::UnknownMember(member))
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut LedgerRow> {
        self.rows.iter_mut()
    }

    pub(crate) fn set_stage(&mut self, stage: AuditStage) {
        self.stage = stage;
    }

    pub(crate) fn set_closing_reserve(&mut self, balance: i64) {
        self.closing_reserve_balance = Some(balance);
    }
}
