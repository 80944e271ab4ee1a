use crate::core::ledger::{ClosingBalances, LedgerRow};
use crate::core::member::GroupId;
use crate::core::period::{AuditPeriod, PeriodKey};
use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};

/// Closing balances of the most recent finalized period before a given one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorClosing {
    pub period: PeriodKey,
    pub balances: Vec<ClosingBalances>,
}

/// Durable storage behind the engine.
///
/// Implementations must make `save_period` atomic: after it returns, the
/// period holds either the full new row set or the untouched old one.
pub trait PersistenceGateway {
    /// Replace the period's rows and record its closing reserve.
    fn save_period(
        &mut self,
        group: GroupId,
        period: PeriodKey,
        rows: &[LedgerRow],
        closing_reserve: i64,
    ) -> Result<AuditPeriod, PersistenceError>;

    /// Closing balances of the latest finalized period strictly before `period`.
    fn load_prior_period_closing(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<Option<PriorClosing>, PersistenceError>;

    /// Closing reserve of the latest finalized period strictly before
    /// `period`, or 0 when there is none.
    fn load_latest_finalized_reserve(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<i64, PersistenceError>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for &mut G {
    fn save_period(
        &mut self,
        group: GroupId,
        period: PeriodKey,
        rows: &[LedgerRow],
        closing_reserve: i64,
    ) -> Result<AuditPeriod, PersistenceError> {
        (**self).save_period(group, period, rows, closing_reserve)
    }

    fn load_prior_period_closing(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<Option<PriorClosing>, PersistenceError> {
        (**self).load_prior_period_closing(group, period)
    }

    fn load_latest_finalized_reserve(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<i64, PersistenceError> {
        (**self).load_latest_finalized_reserve(group, period)
    }
}
