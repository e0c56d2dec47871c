//! Error types for the analytics engine.
//!
//! Only two situations surface as errors:
//!
//! | Variant | Usage |
//! |---------|-------|
//! | `InvalidArgument` | Caller misuse (negative capital, zero horizon, inverted range) |
//! | `InsufficientData` | Range requests the data cannot honour (one series, window longer than history) |
//!
//! Degenerate inputs (no trades, zero volatility, no losers) are never errors;
//! they resolve to zeros or [`Ratio`](crate::types::Ratio) sentinels.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors returned by analytics operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// An argument violates the operation's contract.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Why the value was refused.
        reason: String,
    },

    /// Not enough observations to produce a meaningful result.
    #[error("Insufficient data for {context}: need {required}, have {available}")]
    InsufficientData {
        /// What was being computed.
        context: String,
        /// Observations required.
        required: usize,
        /// Observations available.
        available: usize,
    },
}

impl AnalyticsError {
    /// Build an `InvalidArgument` error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Build an `InsufficientData` error.
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    /// Whether this error reports missing data rather than misuse.
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

/// Reject negative capital-like arguments.
pub(crate) fn ensure_non_negative(name: &'static str, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AnalyticsError::invalid(
            name,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(())
}
