pub mod ledger;
pub mod member;
pub mod period;
