use crate::core::ledger::LedgerRow;
use crate::core::member::GroupId;
use crate::core::period::{AuditPeriod, PeriodId, PeriodKey};
use crate::error::PersistenceError;
use crate::persistence::gateway::{PersistenceGateway, PriorClosing};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A finalized period and its full row set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPeriod {
    pub header: AuditPeriod,
    pub rows: Vec<LedgerRow>,
}

/// In-process store, serialisable to a JSON file.
///
/// Keeps exactly one entry per (group, month, year); saving a period again
/// swaps in the new row set whole and keeps the original period id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGateway {
    periods: Vec<StoredPeriod>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store file; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| PersistenceError::Unavailable(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| PersistenceError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    /// Write the store to disk via a temporary file and rename.
    pub fn flush(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| PersistenceError::Unavailable(format!("{}: {}", path.display(), e)))
    }

    pub fn period(&self, group: GroupId, period: PeriodKey) -> Option<&StoredPeriod> {
        self.periods
            .iter()
            .find(|p| p.header.group_id == group && p.header.period == period)
    }

    /// All stored periods of a group, oldest first.
    pub fn history(&self, group: GroupId) -> Vec<&AuditPeriod> {
        let mut headers: Vec<&AuditPeriod> = self
            .periods
            .iter()
            .map(|p| &p.header)
            .filter(|h| h.group_id == group)
            .collect();
        headers.sort_by_key(|h| h.period);
        headers
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    fn latest_finalized_before(&self, group: GroupId, period: PeriodKey) -> Option<&StoredPeriod> {
        self.periods
            .iter()
            .filter(|p| {
                p.header.group_id == group && p.header.is_finalized && p.header.period < period
            })
            .max_by_key(|p| p.header.period)
    }
}

impl PersistenceGateway for MemoryGateway {
    fn save_period(
        &mut self,
        group: GroupId,
        period: PeriodKey,
        rows: &[LedgerRow],
        closing_reserve: i64,
    ) -> Result<AuditPeriod, PersistenceError> {
        let existing = self
            .periods
            .iter()
            .position(|p| p.header.group_id == group && p.header.period == period);

        let header = AuditPeriod {
            id: existing
                .map(|i| self.periods[i].header.id)
                .unwrap_or_default(),
            group_id: group,
            period,
            is_finalized: true,
            closing_reserve_balance: Some(closing_reserve),
            finalized_at: Some(Utc::now()),
        };
        let replacement = StoredPeriod {
            header: header.clone(),
            rows: rows.to_vec(),
        };

        match existing {
            Some(i) => self.periods[i] = replacement,
            None => self.periods.push(replacement),
        }
        Ok(header)
    }

    fn load_prior_period_closing(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<Option<PriorClosing>, PersistenceError> {
        Ok(self
            .latest_finalized_before(group, period)
            .map(|p| PriorClosing {
                period: p.header.period,
                balances: p.rows.iter().map(LedgerRow::closing_balances).collect(),
            }))
    }

    fn load_latest_finalized_reserve(
        &self,
        group: GroupId,
        period: PeriodKey,
    ) -> Result<i64, PersistenceError> {
        Ok(self
            .latest_finalized_before(group, period)
            .and_then(|p| p.header.closing_reserve_balance)
            .unwrap_or(0))
    }
}
