use crate::calculation::interest::{InterestRates, RoundingPolicy};
use serde::{Deserialize, Serialize};

/// Everything the waterfall reads for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallInputs {
    pub savings_bf: i64,
    pub loan_bf: i64,
    pub advance_bf: i64,
    pub cash_today: i64,
    pub fines: i64,
    pub loan_principal: i64,
    pub advance_principal: i64,
    /// Zero until the allocation stage.
    pub new_loan: i64,
}

/// Today's movements and closing balances for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallResult {
    pub advance_interest: i64,
    pub loan_interest: i64,
    pub deductions: i64,
    /// Negative when deductions exceed the cash brought today.
    pub savings_today: i64,
    pub savings_cf: i64,
    pub loan_cf: i64,
    pub advance_cf: i64,
}

impl WaterfallResult {
    /// Today's contribution did not cover the deductions.
    #[must_use]
    pub fn is_deficit(&self) -> bool {
        self.savings_today < 0
    }
}

/// Per-member waterfall: interest first, then deductions, then savings.
///
/// # Algorithm
///
/// 1. advance interest on the advance balance brought forward.
/// 2. loan interest on the loan balance brought forward.
/// 3. deductions = fines + loan principal + loan interest
///    + advance principal + advance interest.
/// 4. savings today = cash today - deductions.
/// 5. savings CF = savings BF + savings today.
/// 6. loan CF = loan BF - loan principal + new loan.
/// 7. advance CF = advance BF - advance principal.
///
/// The computation is pure; the same inputs always give the same result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Waterfall {
    pub rounding: RoundingPolicy,
    pub rates: InterestRates,
}

impl Waterfall {
    pub fn new(rounding: RoundingPolicy, rates: InterestRates) -> Self {
        Self { rounding, rates }
    }

    pub fn compute(&self, inputs: &WaterfallInputs) -> WaterfallResult {
        let advance_interest = self.rounding.interest(inputs.advance_bf, self.rates.advance);
        let loan_interest = self.rounding.interest(inputs.loan_bf, self.rates.loan);

        let deductions = inputs.fines
            + inputs.loan_principal
            + loan_interest
            + inputs.advance_principal
            + advance_interest;

        let savings_today = inputs.cash_today - deductions;

        WaterfallResult {
            advance_interest,
            loan_interest,
            deductions,
            savings_today,
            savings_cf: inputs.savings_bf + savings_today,
            loan_cf: inputs.loan_bf - inputs.loan_principal + inputs.new_loan,
            advance_cf: inputs.advance_bf - inputs.advance_principal,
        }
    }
}

/// Largest amount accepted for any single input field.
///
/// Keeps every column total and carried balance well inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Lenient amount parsing for hand-entered figures.
///
/// Blank, non-numeric and negative text yields `None`; callers decide
/// whether that means zero or a rejection. Accepts thousands separators
/// and a trailing `.0`-style fraction of zeros.
pub fn parse_amount(raw: &str) -> Option<i64> {
    parse_signed_amount(raw).filter(|v| *v >= 0)
}

/// Like [`parse_amount`] but keeps a leading minus sign, so `"-1,500"`
/// reads as `-1500`.
pub fn parse_signed_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let whole = match cleaned.split_once('.') {
        Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
        Some(_) => return None,
        None => cleaned.as_str(),
    };
    whole.parse::<i64>().ok()
}
