use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BizCalcError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BizCalcError {
    /// Shorthand for the validation variant used by every calculator.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BizCalcError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BizCalcError {
    fn from(e: serde_json::Error) -> Self {
        BizCalcError::SerializationError(e.to_string())
    }
}
