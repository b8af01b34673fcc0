use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    /// Month generation was asked for with nothing to generate
    #[error("No recurring expenses to generate")]
    NoTemplates,

    /// A template carries a day of month outside 1..=31
    #[error("Recurring expense {template_id} has invalid day {day}")]
    InvalidDay { template_id: i32, day: u32 },

    /// Error from date operations
    #[error("Date error: {0}")]
    Date(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
