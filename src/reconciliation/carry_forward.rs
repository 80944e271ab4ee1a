use crate::core::ledger::{ClosingBalances, LedgerRow, OpeningBalances};
use crate::core::member::{Member, MemberId};
use serde::Serialize;
use std::collections::HashMap;

/// Opening rows for a new period plus the roster changes found on the way.
#[derive(Debug, Clone, Serialize)]
pub struct CarryForwardOutcome {
    /// One row per member of the new roster, in roster order.
    pub rows: Vec<LedgerRow>,
    /// Members in the new roster with no closing row in the source period.
    pub joined: Vec<MemberId>,
    /// Closing balances of members who left; not carried anywhere.
    pub departed: Vec<ClosingBalances>,
}

/// Builds a period's opening ledger from the previous period's closing one.
///
/// Rows are matched strictly by [`MemberId`]. Neither row position nor
/// display name is ever used to pair a closing row with an opening row.
pub struct CarryForwardMapper;

impl CarryForwardMapper {
    /// Map closing balances onto the next period's roster.
    ///
    /// - Members in both: BF = previous CF, all other fields zero.
    /// - Members new to the roster: an all-zero row.
    /// - Members missing from the roster: dropped, reported in `departed`.
    pub fn map(closing: &[ClosingBalances], roster: &[Member]) -> CarryForwardOutcome {
        let by_member: HashMap<MemberId, &ClosingBalances> =
            closing.iter().map(|c| (c.member_id, c)).collect();

        let mut joined = Vec::new();
        let rows = roster
            .iter()
            .map(|member| match by_member.get(&member.id()) {
                Some(prev) => LedgerRow::opening(
                    member,
                    OpeningBalances {
                        savings_bf: prev.savings_cf,
                        loan_bf: prev.loan_cf,
                        advance_bf: prev.advance_cf,
                    },
                ),
                None => {
                    joined.push(member.id());
                    LedgerRow::opening(member, OpeningBalances::default())
                }
            })
            .collect();

        let departed = closing
            .iter()
            .filter(|c| !roster.iter().any(|m| m.id() == c.member_id))
            .copied()
            .collect();

        CarryForwardOutcome {
            rows,
            joined,
            departed,
        }
    }

    /// Opening rows for a cohort with no history: everything zero.
    pub fn fresh(roster: &[Member]) -> Vec<LedgerRow> {
        roster
            .iter()
            .map(|m| LedgerRow::opening(m, OpeningBalances::default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::InputField;
    use crate::core::member::Group;

    fn closing(member: MemberId, savings: i64, loan: i64, advance: i64) -> ClosingBalances {
        ClosingBalances {
            member_id: member,
            savings_cf: savings,
            loan_cf: loan,
            advance_cf: advance,
        }
    }

    #[test]
    fn test_matched_member_carries_all_balances() {
        let mut group = Group::new("Sunrise Chama");
        let a = group.add_member("Alice", "ACC-001").unwrap();
        let outcome = CarryForwardMapper::map(&[closing(a, 300, 1200, 50)], group.members());

        let row = &outcome.rows[0];
        assert_eq!(row.savings_bf(), 300);
        assert_eq!(row.loan_bf(), 1200);
        assert_eq!(row.advance_bf(), 50);
        for field in InputField::ALL {
            assert_eq!(row.input(field), 0);
        }
        assert_eq!(row.savings_cf(), 0);
        assert!(row.attendance().is_none());
        assert!(outcome.joined.is_empty());
        assert!(outcome.departed.is_empty());
    }

    #[test]
    fn test_roster_reorder_and_rename_do_not_misattribute() {
        let mut group = Group::new("Sunrise Chama");
        let a = group.add_member("Alice", "ACC-001").unwrap();
        let b = group.add_member("Bob", "ACC-002").unwrap();
        // Closing rows listed in the opposite order from the roster.
        let prev = [closing(b, 150, 0, 0), closing(a, 300, 0, 0)];
        group.member_mut(a).unwrap().rename("Bob");

        let outcome = CarryForwardMapper::map(&prev, group.members());
        let by_id = |id| {
            outcome
                .rows
                .iter()
                .find(|r| r.member_id() == id)
                .unwrap()
                .savings_bf()
        };
        assert_eq!(by_id(a), 300);
        assert_eq!(by_id(b), 150);
    }

    #[test]
    fn test_joiners_and_leavers() {
        let mut group = Group::new("Sunrise Chama");
        let a = group.add_member("Alice", "ACC-001").unwrap();
        let b = group.add_member("Bob", "ACC-002").unwrap();
        let prev = [closing(a, 300, 0, 0), closing(b, 150, 0, 0)];
        group.remove_member(b);
        let c = group.add_member("Carol", "ACC-003").unwrap();

        let outcome = CarryForwardMapper::map(&prev, group.members());
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.joined, vec![c]);
        assert_eq!(outcome.departed.len(), 1);
        assert_eq!(outcome.departed[0].member_id, b);
        assert!(outcome.rows.iter().all(|r| r.member_id() != b));
    }

    #[test]
    fn test_fresh_cohort() {
        let mut group = Group::new("Sunrise Chama");
        group.add_member("Alice", "ACC-001").unwrap();
        let rows = CarryForwardMapper::fresh(group.members());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].opening_balances(), OpeningBalances::default());
    }
}
