pub mod gateway;
pub mod memory;
