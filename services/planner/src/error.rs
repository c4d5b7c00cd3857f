use std::time::Duration;
use thiserror::Error;

/// Failures that stop a run before any decision table exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("budget ledger could not be loaded: {0}")]
    LedgerUnavailable(String),

    #[error("budget ledger column '{column}' is unusable: {reason}")]
    LedgerColumn { column: String, reason: String },

    #[error("budget ledger did not respond within {0:?}")]
    LedgerTimeout(Duration),
}

impl PipelineError {
    /// True for errors where the ledger file itself is absent or unreadable.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PipelineError::LedgerUnavailable(_) | PipelineError::LedgerTimeout(_))
    }
}
