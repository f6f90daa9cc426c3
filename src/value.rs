//! Cell values for follow-up records
//!
//! Every cell is either missing, a finite number, or free text. Values that
//! cannot be read as numbers are kept as text and never take part in numeric
//! comparisons. Numbers keep the text they were read from, so identifiers
//! such as `007` and `7` stay distinct.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel spellings treated as a missing cell (compared case-insensitively)
const MISSING_SENTINELS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

/// A single cell of the record store
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Number { value: f64, raw: String },
    Text(String),
}

impl Value {
    /// Parse a raw cell as read from a dataset file
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_SENTINELS
            .iter()
            .any(|s| trimmed.eq_ignore_ascii_case(s))
        {
            return Value::Missing;
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Value::Number {
                value,
                raw: trimmed.to_string(),
            },
            // "inf" and friends stay text
            _ => Value::Text(trimmed.to_string()),
        }
    }

    /// Build a numeric cell from a computed number
    pub fn number(value: f64) -> Self {
        Value::Number {
            value,
            raw: format_number(value),
        }
    }

    /// True for any non-missing cell
    pub fn is_present(&self) -> bool {
        !matches!(self, Value::Missing)
    }

    /// Numeric view of the cell; text and missing cells have none
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Check whether this cell equals a configured categorical label
    ///
    /// Numeric labels compare by value; text labels compare against the cell
    /// exactly as written.
    pub fn matches_label(&self, label: &Label) -> bool {
        match (self, label) {
            (Value::Missing, _) => false,
            (Value::Text(s), Label::Text(l)) => s == l,
            (Value::Text(_), Label::Number(_)) => false,
            (Value::Number { value, .. }, Label::Number(n)) => value == n,
            (Value::Number { raw, .. }, Label::Text(l)) => raw == l.trim(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number { raw, .. } => f.write_str(raw),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Format a number without a trailing ".0" for integral values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A categorical value named in configuration (`"Female"` or `1`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Number(f64),
    Text(String),
}

impl Label {
    /// Parse a label from command-line text
    ///
    /// Plain numbers such as `1` become numeric labels. Codes written in any
    /// other form (`01`, `1.50`) are matched as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && format_number(n) == trimmed => Label::Number(n),
            _ => Label::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(n) => write!(f, "{}", format_number(*n)),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<f64> for Label {
    fn from(n: f64) -> Self {
        Label::Number(n)
    }
}

/// Inclusive numeric interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Reject non-finite bounds and inverted intervals
    pub fn validate(&self, name: &str) -> Result<(), PipelineError> {
        if self.lo.is_finite() && self.hi.is_finite() && self.lo <= self.hi {
            Ok(())
        } else {
            Err(PipelineError::InvalidRange {
                name: name.to_string(),
                lo: self.lo,
                hi: self.hi,
            })
        }
    }

    /// True when the cell holds a number within the bounds (inclusive)
    pub fn contains(&self, value: &Value) -> bool {
        value
            .as_number()
            .is_some_and(|n| self.lo <= n && n <= self.hi)
    }
}

impl From<[f64; 2]> for Interval {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self { lo, hi }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(i: Interval) -> Self {
        [i.lo, i.hi]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", format_number(self.lo), format_number(self.hi))
    }
}
