pub mod interest;
pub mod waterfall;
