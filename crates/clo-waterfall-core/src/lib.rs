pub mod error;
pub mod time_value;
pub mod types;

pub mod deal;
pub mod engine;
pub mod report;
pub mod state;
pub mod waterfall;

pub use error::CloError;
pub use types::*;

/// Standard result type for all CLO waterfall operations
pub type CloResult<T> = Result<T, CloError>;
