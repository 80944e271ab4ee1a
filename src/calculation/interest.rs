use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How a percentage interest charge is turned into whole currency units.
///
/// One policy is chosen per deployment and applied to every charge.
///
/// # Examples
///
/// ```
/// use chama_ledger::calculation::interest::RoundingPolicy;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(RoundingPolicy::Truncate.interest(200, dec!(0.015)), 3);
/// assert_eq!(RoundingPolicy::NearestFive.interest(200, dec!(0.015)), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// `floor(base * rate)`.
    #[default]
    Truncate,
    /// Round to the nearest multiple of 5; halves round up.
    NearestFive,
}

impl RoundingPolicy {
    /// Interest on an outstanding balance. A negative base charges nothing.
    pub fn interest(&self, base: i64, rate: Decimal) -> i64 {
        let raw = Decimal::from(base.max(0)) * rate;
        let rounded = match self {
            Self::Truncate => raw.floor(),
            Self::NearestFive => {
                (raw / dec!(5)).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    * dec!(5)
            }
        };
        rounded.to_i64().unwrap_or(0)
    }
}

/// Monthly interest rates charged on outstanding balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestRates {
    /// Charged on the advance balance brought forward.
    pub advance: Decimal,
    /// Charged on the loan balance brought forward.
    pub loan: Decimal,
}

impl Default for InterestRates {
    fn default() -> Self {
        Self {
            advance: dec!(0.10),
            loan: dec!(0.015),
        }
    }
}
