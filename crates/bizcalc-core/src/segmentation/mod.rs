pub mod cohorts;
pub mod records;
pub mod rules;
