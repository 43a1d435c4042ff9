pub mod affordability;
pub mod amortization;

/// Longest loan term the calculators accept, in years.
pub const MAX_TERM_YEARS: u32 = 50;
