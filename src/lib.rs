//! # chama-ledger
//!
//! Period ledger and audit workflow engine for community savings and
//! credit groups (chamas).
//!
//! Each month a group meets, members bring cash, repay loans and
//! advances, pay fines and may receive new credit. This crate computes
//! every member's movements and closing balances, carries them into the
//! next month, reconciles the group's cash reserve and gates all of it
//! behind an explicit audit workflow.
//!
//! ## Architecture
//!
//! - **core**: Members, groups, periods and the per-period ledger
//! - **calculation**: Interest rounding and the per-member waterfall
//! - **reconciliation**: Period-to-period carry-forward and bank reconciliation
//! - **workflow**: The audit stage machine and batch session runs
//! - **persistence**: Storage gateway trait and an in-memory/JSON store
//! - **simulation**: Random cohort generation

pub mod calculation;
pub mod config;
pub mod core;
pub mod error;
pub mod persistence;
pub mod reconciliation;
pub mod simulation;
pub mod workflow;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::calculation::interest::RoundingPolicy;
    pub use crate::calculation::waterfall::{Waterfall, WaterfallInputs, WaterfallResult};
    pub use crate::config::EngineConfig;
    pub use crate::core::ledger::{AttendanceStatus, InputField, LedgerRow, PeriodLedger};
    pub use crate::core::member::{Group, MemberId};
    pub use crate::core::period::{AuditStage, PeriodKey};
    pub use crate::error::{EngineError, Warning};
    pub use crate::persistence::gateway::PersistenceGateway;
    pub use crate::persistence::memory::MemoryGateway;
    pub use crate::reconciliation::bank::{BankReconciler, BankReconciliation, CashFlow};
    pub use crate::reconciliation::carry_forward::CarryForwardMapper;
    pub use crate::workflow::engine::{AuditEngine, FinalizeOutcome, StageOutcome};
}
