use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Period;

#[derive(Debug, Error)]
pub enum CloError {
    #[error("Configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Senior default at period {period}: {tranche} interest due {due} exceeds available {available}")]
    SeniorDefault {
        period: Period,
        tranche: String,
        due: Decimal,
        available: Decimal,
    },

    #[error("Waterfall imbalance at period {period}: {waterfall} pool has {leftover} left over")]
    WaterfallImbalance {
        period: Period,
        waterfall: String,
        leftover: Decimal,
    },

    #[error("Arithmetic error in {context}")]
    Arithmetic { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CloError {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CloError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the two errors that stop a run mid-simulation.
    pub fn is_waterfall_halt(&self) -> bool {
        matches!(
            self,
            CloError::SeniorDefault { .. } | CloError::WaterfallImbalance { .. }
        )
    }
}

impl From<serde_json::Error> for CloError {
    fn from(e: serde_json::Error) -> Self {
        CloError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for CloError {
    fn from(e: std::io::Error) -> Self {
        CloError::Storage(e.to_string())
    }
}
