//! Random cohort generation for benchmarks and stress runs.
//!
//! Produces a group roster and a session of plausible meeting figures:
//! most members attend and contribute, some arrive late or send an
//! apology, and a share of attendees take out loans or advances.

use crate::core::ledger::AttendanceStatus;
use crate::core::member::Group;
use crate::workflow::session::{MemberEntry, SessionFile};
use rand::Rng;
use serde_json::json;

/// Configuration for generating a random cohort.
#[derive(Debug, Clone)]
pub struct CohortConfig {
    pub group_name: String,
    pub member_count: usize,
    pub month: u32,
    pub year: i32,
    pub min_contribution: i64,
    pub max_contribution: i64,
    /// Probability a member does not attend (absent or apology).
    pub absence_rate: f64,
    /// Probability an attending member arrives late.
    pub late_rate: f64,
    /// Probability an attending member requests a loan.
    pub loan_rate: f64,
    pub max_loan: i64,
    /// Probability an attending member requests an advance.
    pub advance_rate: f64,
    pub max_advance: i64,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            group_name: "Simulated Chama".to_string(),
            member_count: 20,
            month: 1,
            year: 2025,
            min_contribution: 500,
            max_contribution: 5_000,
            absence_rate: 0.1,
            late_rate: 0.15,
            loan_rate: 0.2,
            max_loan: 10_000,
            advance_rate: 0.1,
            max_advance: 2_000,
        }
    }
}

/// Generate a roster and one period of meeting figures.
pub fn generate_session(config: &CohortConfig) -> SessionFile {
    let mut rng = rand::thread_rng();
    let mut group = Group::new(config.group_name.clone());

    let mut entries = Vec::with_capacity(config.member_count);
    for i in 0..config.member_count {
        let account = format!("ACC-{:04}", i + 1);
        if group.add_member(format!("Member {}", i + 1), account.clone()).is_err() {
            continue;
        }

        let attendance = if rng.gen_bool(config.absence_rate.clamp(0.0, 1.0)) {
            if rng.gen_bool(0.5) {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Apology
            }
        } else if rng.gen_bool(config.late_rate.clamp(0.0, 1.0)) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };

        let mut entry = MemberEntry {
            account_number: account,
            attendance: Some(attendance),
            ..Default::default()
        };

        if attendance.may_receive_disbursement() {
            let low = config.min_contribution.max(0);
            let high = config.max_contribution.max(low + 1);
            entry.cash_today = Some(json!(rng.gen_range(low..high)));
            if config.max_loan > 0 && rng.gen_bool(config.loan_rate.clamp(0.0, 1.0)) {
                entry.new_loan = Some(json!(rng.gen_range(1..=config.max_loan)));
            }
            if config.max_advance > 0 && rng.gen_bool(config.advance_rate.clamp(0.0, 1.0)) {
                entry.new_advance = Some(json!(rng.gen_range(1..=config.max_advance)));
            }
        }
        entries.push(entry);
    }

    SessionFile {
        group,
        month: config.month,
        year: config.year,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_session_shape() {
        let config = CohortConfig {
            member_count: 50,
            ..Default::default()
        };
        let session = generate_session(&config);
        assert_eq!(session.group.members().len(), 50);
        assert_eq!(session.entries.len(), 50);
        for entry in &session.entries {
            assert!(session.group.member_by_account(&entry.account_number).is_some());
        }
    }

    #[test]
    fn test_absent_members_never_borrow() {
        let config = CohortConfig {
            member_count: 100,
            absence_rate: 0.5,
            loan_rate: 1.0,
            ..Default::default()
        };
        let session = generate_session(&config);
        for entry in &session.entries {
            let eligible = entry
                .attendance
                .map(|a| a.may_receive_disbursement())
                .unwrap_or(false);
            if !eligible {
                assert!(entry.new_loan.is_none());
                assert!(entry.new_advance.is_none());
            }
        }
    }
}
