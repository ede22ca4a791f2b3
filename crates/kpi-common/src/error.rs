//! KPI Error - Unified Error Types
//!
//! Error handling shared by the formula language and the retrieval pipeline.
//! Syntax and resolution problems are user errors; store failures cross the
//! boundary untouched so callers see exactly what the store reported.
//!
//! Key Features:
//! - Formula syntax errors carrying the offending token and its position
//! - Unsupported resolution values rejected at stage construction
//! - Store failures propagated without wrapping or retry
//! - User vs system error classification
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for KPI retrieval operations.
#[derive(Error, Debug)]
pub enum KpiError {
    // Formula errors
    #[error("syntax error at position {position}: {message} (near '{token}')")]
    Syntax {
        position: usize,
        token: String,
        message: String,
    },

    #[error("invalid variable: {0}")]
    InvalidVariable(String),

    // Time bucketing errors
    #[error("unsupported resolution: {0} seconds")]
    UnsupportedResolution(u32),

    #[error("unsupported aggregation: {0}")]
    UnsupportedAggregation(String),

    // Store errors
    #[error("store error: {0}")]
    Store(String),

    // Pipeline errors
    #[error("execution error: {0}")]
    Execution(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for KPI operations.
pub type Result<T> = std::result::Result<T, KpiError>;

// =============================================================================
// Error Classification
// =============================================================================

impl KpiError {
    /// Build a syntax error pointing at a token.
    pub fn syntax(position: usize, token: impl Into<String>, message: impl Into<String>) -> Self {
        KpiError::Syntax {
            position,
            token: token.into(),
            message: message.into(),
        }
    }

    /// Returns true if the operation can be safely retried.
    ///
    /// Nothing in the pipeline retries; retry policy belongs to the store.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if this is a user error (vs system error).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            KpiError::Syntax { .. }
                | KpiError::InvalidVariable(_)
                | KpiError::UnsupportedResolution(_)
                | KpiError::UnsupportedAggregation(_)
        )
    }

    /// Returns true if the failure originated in the store boundary.
    pub fn is_store_error(&self) -> bool {
        matches!(self, KpiError::Store(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
