pub mod export;
pub mod projection;

/// Longest projection horizon accepted, in years.
pub const MAX_HORIZON_YEARS: u32 = 50;
