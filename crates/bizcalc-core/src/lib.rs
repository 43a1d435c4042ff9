pub mod error;
pub mod format;
pub mod time_value;
pub mod types;

#[cfg(feature = "mortgage")]
pub mod mortgage;

#[cfg(feature = "roi")]
pub mod roi;

#[cfg(feature = "segmentation")]
pub mod segmentation;

pub use error::BizCalcError;
pub use types::*;

/// Standard result type for all bizcalc operations
pub type BizCalcResult<T> = Result<T, BizCalcError>;
