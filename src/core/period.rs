use crate::core::member::GroupId;
use crate::error::ValidationError;
use chrono::{DateTime, Month, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a persisted audit period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(Uuid);

impl PeriodId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeriodId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A calendar month of a group's accounting, e.g. March 2025.
///
/// Orders chronologically (year first, then month).
///
/// # Examples
///
/// ```
/// use chama_ledger::core::period::PeriodKey;
///
/// let dec = PeriodKey::new(12, 2024).unwrap();
/// assert_eq!(dec.next(), PeriodKey::new(1, 2025).unwrap());
/// assert_eq!(dec.to_string(), "December 2024");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The following calendar month. December rolls into January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

/// Which stage a period's workflow opens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowVariant {
    /// Attendance is confirmed before collection starts.
    #[default]
    Full,
    /// Starts directly at collection; everyone is treated as present.
    Simplified,
}

/// Stage of a period's audit workflow.
///
/// The valid transitions are:
/// - AttendanceCheck → Collection (confirm attendance)
/// - Collection → Allocation (phase switch)
/// - Allocation → Finalized (finalize)
///
/// A finalized period has no successor stage; the workflow continues
/// in a new period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStage {
    AttendanceCheck,
    Collection,
    Allocation,
    Finalized,
}

impl AuditStage {
    pub fn initial(variant: WorkflowVariant) -> Self {
        match variant {
            WorkflowVariant::Full => Self::AttendanceCheck,
            WorkflowVariant::Simplified => Self::Collection,
        }
    }

    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::AttendanceCheck => Some(Self::Collection),
            Self::Collection => Some(Self::Allocation),
            Self::Allocation => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttendanceCheck => "ATTENDANCE_CHECK",
            Self::Collection => "COLLECTION",
            Self::Allocation => "ALLOCATION",
            Self::Finalized => "FINALIZED",
        }
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted period header. Unique per (group, month, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPeriod {
    pub id: PeriodId,
    pub group_id: GroupId,
    pub period: PeriodKey,
    pub is_finalized: bool,
    /// Set only at finalization.
    pub closing_reserve_balance: Option<i64>,
    pub finalized_at: Option<DateTime<Utc>>,
}
