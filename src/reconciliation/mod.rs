pub mod bank;
pub mod carry_forward;
