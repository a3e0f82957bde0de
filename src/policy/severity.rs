//! Vulnerability severity ladder.
//!
//! Severities form a total order with two sentinels widening the lattice:
//! `BLOCK_ALL` sits below every real severity and `ALLOW_ALL` above them all.
//! Policy thresholds are compared with [`Severity::exceeds`].

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A vulnerability severity or threshold sentinel.
///
/// The derived `Ord` is the policy order: `BLOCK_ALL < LOW < MEDIUM < HIGH <
/// CRITICAL < ALLOW_ALL`.
#[derive(
    Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Sentinel: every real severity exceeds this threshold.
    BlockAll,
    Low,
    Medium,
    High,
    Critical,
    /// Sentinel: no severity exceeds this threshold.
    AllowAll,
}

/// Error returned when a severity string is not one of the recognized names.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized severity {0:?}")]
pub struct ParseSeverityError(pub String);

impl Severity {
    /// True iff `self` ranks strictly above `threshold`.
    ///
    /// With `threshold == AllowAll` this is always false; with
    /// `threshold == BlockAll` it is true for any real severity.
    pub fn exceeds(self, threshold: Severity) -> bool {
        self > threshold
    }

    /// Parse a severity, mapping the empty string to `default`.
    ///
    /// The default is chosen by the caller: ISP fields have per-field
    /// defaults and the ladder does not pick between them.
    pub fn parse_or(s: &str, default: Severity) -> Result<Severity, ParseSeverityError> {
        if s.is_empty() {
            return Ok(default);
        }
        s.parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::BlockAll => "BLOCK_ALL",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::AllowAll => "ALLOW_ALL",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLOCK_ALL" => Ok(Severity::BlockAll),
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            "ALLOW_ALL" => Ok(Severity::AllowAll),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
