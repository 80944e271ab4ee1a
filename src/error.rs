use crate::core::ledger::{AttendanceStatus, ClosingBalances, InputField};
use crate::core::member::MemberId;
use crate::core::period::{AuditStage, PeriodKey};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A request rejected before any mutation took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be edited during {stage}")]
    StageMismatch { field: InputField, stage: AuditStage },
    #[error("member {0} is not on this period's roster")]
    UnknownMember(MemberId),
    #[error("no member with account number {0}")]
    UnknownAccount(String),
    #[error("{field} must be a non-negative amount, got {value}")]
    NegativeDisbursement { field: InputField, value: i64 },
    #[error("{field} must be a whole number, got {raw:?}")]
    NonNumericDisbursement { field: InputField, raw: String },
    #[error("{field} of {value} exceeds the limit of {max}")]
    AmountTooLarge { field: InputField, value: i64, max: i64 },
    #[error("{field} of {requested} exceeds the outstanding balance of {balance}")]
    RepaymentExceedsBalance {
        field: InputField,
        requested: i64,
        balance: i64,
    },
    #[error("withdrawal of {requested} exceeds available savings of {available}")]
    WithdrawalExceedsSavings { requested: i64, available: i64 },
    #[error("attendance can only be recorded during ATTENDANCE_CHECK, period is in {0}")]
    AttendanceClosed(AuditStage),
    #[error("guarantors can only be recorded during ALLOCATION, period is in {0}")]
    GuarantorsClosed(AuditStage),
    #[error("{missing} member(s) have no recorded attendance")]
    AttendanceIncomplete { missing: usize },
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("account number {0} is already in use")]
    DuplicateAccountNumber(String),
    #[error("member {0} is already on the roster")]
    DuplicateMember(MemberId),
    #[error("ledger belongs to a different group")]
    GroupMismatch,
    #[error("{0} has no finalized record in storage")]
    PeriodNotPersisted(PeriodKey),
}

/// A loan or advance requested for a member whose attendance disqualifies them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("member {member} ({status}) is not eligible for a {field}")]
pub struct EligibilityError {
    pub member: MemberId,
    pub status: AttendanceLabel,
    pub field: InputField,
}

/// Attendance as shown in eligibility errors; `None` reads as "unrecorded".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceLabel(pub Option<AttendanceStatus>);

impl fmt::Display for AttendanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(status) => write!(f, "{}", status),
            None => f.write_str("unrecorded"),
        }
    }
}

/// Failure reported by the persistence gateway. Nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Failure loading an engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("interest rate for {name} must not be negative")]
    NegativeRate { name: &'static str },
    #[error("fine for {name} must not be negative")]
    NegativeFine { name: &'static str },
    #[error("fine for {name} exceeds the limit of {max}")]
    FineTooLarge { name: &'static str, max: i64 },
}

/// Everything an engine operation can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{} ineligible disbursement(s): {}", .0.len(), join(.0))]
    Eligibility(Vec<EligibilityError>),
    #[error("cannot {action} while the period is in {stage}")]
    InvalidTransition {
        stage: AuditStage,
        action: &'static str,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<EligibilityError> for EngineError {
    fn from(e: EligibilityError) -> Self {
        EngineError::Eligibility(vec![e])
    }
}

fn join(errors: &[EligibilityError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A non-fatal condition surfaced alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A withdrawal larger than the member's savings after today.
    CapacityWarning {
        member: MemberId,
        requested: i64,
        available: i64,
    },
    /// The reserve could not cover disbursements; money was borrowed.
    ReconciliationCritical { external_borrowing: i64 },
    /// A member left the roster with balances that were not carried.
    DepartedMember { balances: ClosingBalances },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityWarning {
                member,
                requested,
                available,
            } => write!(
                f,
                "member {} withdraws {} but only {} is available",
                member, requested, available
            ),
            Self::ReconciliationCritical { external_borrowing } => write!(
                f,
                "reserve exhausted: {} must be borrowed externally",
                external_borrowing
            ),
            Self::DepartedMember { balances } => write!(
                f,
                "member {} left with savings {}, loan {}, advance {} not carried forward",
                balances.member_id, balances.savings_cf, balances.loan_cf, balances.advance_cf
            ),
        }
    }
}
