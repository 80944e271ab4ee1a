pub mod cohort;
