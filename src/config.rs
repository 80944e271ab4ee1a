use crate::calculation::interest::{InterestRates, RoundingPolicy};
use crate::calculation::waterfall::{Waterfall, MAX_AMOUNT};
use crate::core::ledger::AttendanceStatus;
use crate::core::period::WorkflowVariant;
use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fines seeded from attendance when the roster is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineSchedule {
    pub late: i64,
    pub absent: i64,
    pub apology: i64,
}

impl Default for FineSchedule {
    fn default() -> Self {
        Self {
            late: 50,
            absent: 100,
            apology: 20,
        }
    }
}

impl FineSchedule {
    pub fn fine_for(&self, status: AttendanceStatus) -> i64 {
        match status {
            AttendanceStatus::Present => 0,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Apology => self.apology,
        }
    }
}

/// What happens when a withdrawal exceeds the member's available savings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalPolicy {
    /// Accept the write and surface a capacity warning.
    #[default]
    Warn,
    /// Reject the write.
    Block,
}

/// Deployment-wide engine settings.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```
/// use chama_ledger::config::EngineConfig;
/// use chama_ledger::calculation::interest::RoundingPolicy;
///
/// let cfg = EngineConfig::from_json(r#"{ "rounding": "nearest_five" }"#).unwrap();
/// assert_eq!(cfg.rounding, RoundingPolicy::NearestFive);
/// assert_eq!(cfg.fines.absent, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rounding: RoundingPolicy,
    pub rates: InterestRates,
    pub fines: FineSchedule,
    pub workflow: WorkflowVariant,
    pub withdrawal_policy: WithdrawalPolicy,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rates.advance < Decimal::ZERO {
            return Err(ConfigError::NegativeRate { name: "advance" });
        }
        if self.rates.loan < Decimal::ZERO {
            return Err(ConfigError::NegativeRate { name: "loan" });
        }
        for (name, fine) in [
            ("late", self.fines.late),
            ("absent", self.fines.absent),
            ("apology", self.fines.apology),
        ] {
            if fine < 0 {
                return Err(ConfigError::NegativeFine { name });
            }
            if fine > MAX_AMOUNT {
                return Err(ConfigError::FineTooLarge {
                    name,
                    max: MAX_AMOUNT,
                });
            }
        }
        Ok(())
    }

    pub fn waterfall(&self) -> Waterfall {
        Waterfall::new(self.rounding, self.rates)
    }
}
