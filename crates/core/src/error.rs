//! Error types for the hedge evaluation.
//!
//! Every failure names the check that tripped, the quantity it looked at,
//! the observed value and the bound it violated, so the caller can log one
//! line and halt.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Check that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    CompositionTotal,
    CompositionAmount,
    PositionInput,
    CurrentShort,
    Freshness,
    ValuationCeiling,
    BucketWeightRange,
    ShortCeiling,
    PriceValidity,
}

impl Check {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompositionTotal => "composition_total",
            Self::CompositionAmount => "composition_amount",
            Self::PositionInput => "position_input",
            Self::CurrentShort => "current_short",
            Self::Freshness => "freshness",
            Self::ValuationCeiling => "valuation_ceiling",
            Self::BucketWeightRange => "bucket_weight_range",
            Self::ShortCeiling => "short_ceiling",
            Self::PriceValidity => "price_validity",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bound a quantity was held against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Must be finite and strictly positive.
    Positive,
    /// Must be finite and zero or greater.
    NonNegative,
    /// Must not exceed the value.
    AtMost(f64),
    /// Must lie within `[min, max]`.
    Within { min: f64, max: f64 },
    /// A configured bound was required but absent.
    Configured,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "> 0"),
            Self::NonNegative => write!(f, ">= 0"),
            Self::AtMost(max) => write!(f, "<= {max}"),
            Self::Within { min, max } => write!(f, "[{min}, {max}]"),
            Self::Configured => write!(f, "a configured value"),
        }
    }
}

/// Coarse classification used by callers to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed snapshot or configuration gap.
    Precondition,
    /// Snapshot too old (or too far in the future) to act on.
    StaleSnapshot,
    /// A valuation, weight or short-size bound was exceeded.
    RangeViolation,
}

/// Reason an evaluation produced no decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SanityFailure {
    #[error("precondition failed at {check}: {quantity} = {observed} (expected {bound})")]
    Precondition {
        check: Check,
        quantity: String,
        observed: f64,
        bound: Bound,
    },

    #[error(
        "stale snapshot: observed at {observed_at}, evaluated at {now}, \
         age {age_ms}ms exceeds tolerance of {tolerance_ms}ms"
    )]
    StaleSnapshot {
        observed_at: DateTime<Utc>,
        now: DateTime<Utc>,
        age_ms: i64,
        tolerance_ms: u64,
    },

    #[error("range violation at {check}: {quantity} = {observed} (expected {bound})")]
    RangeViolation {
        check: Check,
        quantity: String,
        observed: f64,
        bound: Bound,
    },
}

impl SanityFailure {
    pub fn precondition(
        check: Check,
        quantity: impl Into<String>,
        observed: f64,
        bound: Bound,
    ) -> Self {
        Self::Precondition {
            check,
            quantity: quantity.into(),
            observed,
            bound,
        }
    }

    pub fn range_violation(
        check: Check,
        quantity: impl Into<String>,
        observed: f64,
        bound: Bound,
    ) -> Self {
        Self::RangeViolation {
            check,
            quantity: quantity.into(),
            observed,
            bound,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Precondition { .. } => FailureKind::Precondition,
            Self::StaleSnapshot { .. } => FailureKind::StaleSnapshot,
            Self::RangeViolation { .. } => FailureKind::RangeViolation,
        }
    }

    #[must_use]
    pub const fn check(&self) -> Check {
        match self {
            Self::Precondition { check, .. } | Self::RangeViolation { check, .. } => *check,
            Self::StaleSnapshot { .. } => Check::Freshness,
        }
    }

    /// Name of the offending quantity.
    #[must_use]
    pub fn quantity(&self) -> &str {
        match self {
            Self::Precondition { quantity, .. } | Self::RangeViolation { quantity, .. } => quantity,
            Self::StaleSnapshot { .. } => "snapshot_age_ms",
        }
    }
}

/// Configuration rejected before any evaluation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("weight range for `{bucket}` is inverted: min {min} > max {max}")]
    InvertedRange { bucket: String, min: f64, max: f64 },

    #[error("exposure table routes weight into `{bucket}` but no weight range is configured for it")]
    MissingRange { bucket: String },

    #[error("exposure table has no rule for the stables bucket")]
    MissingStablesRule,
}
