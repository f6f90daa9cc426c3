//! Timepoint bucketing of follow-up rows
//!
//! A bucket is a name plus a membership rule over the timepoint column:
//! either an inclusive numeric range (e.g. months since surgery) or a set of
//! phase labels (e.g. "3 to 4 months"). Buckets are evaluated independently,
//! so overlapping ranges put a boundary row in every bucket it satisfies.
//! Output order always follows the configured bucket order.

use crate::error::{ColumnRole, PipelineError};
use crate::filter::{parse_predicate, Predicate};
use crate::record_store::View;
use crate::value::{format_number, Interval, Label, Value};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Membership rule for a timepoint bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRule {
    /// Inclusive numeric range over elapsed time
    Range(Interval),
    /// Exact phase-label match
    Labels(Vec<Label>),
}

impl BucketRule {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            BucketRule::Range(interval) => interval.contains(value),
            BucketRule::Labels(labels) => labels.iter().any(|l| value.matches_label(l)),
        }
    }
}

/// A named timepoint window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimepointBucket {
    pub name: String,
    pub rule: BucketRule,
}

impl TimepointBucket {
    pub fn range(name: impl Into<String>, lo: f64, hi: f64) -> Self {
        Self {
            name: name.into(),
            rule: BucketRule::Range(Interval::new(lo, hi)),
        }
    }

    pub fn labels<L: Into<Label>>(name: impl Into<String>, labels: impl IntoIterator<Item = L>) -> Self {
        Self {
            name: name.into(),
            rule: BucketRule::Labels(labels.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a bucket expression like "3-4 months=90..120" or "Pre-op=baseline,screening"
    ///
    /// The last `=` separates the name from the rule so names may contain `=`.
    pub fn from_expr(expr: &str) -> Result<Self> {
        let Some((name, spec)) = expr.rsplit_once('=') else {
            bail!(
                "Invalid bucket expression: {}. Expected format: NAME=LO..HI or NAME=LABEL,LABEL",
                expr
            );
        };

        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid bucket expression: {}. Missing bucket name", expr);
        }

        let rule = match parse_predicate(spec)
            .with_context(|| format!("Invalid bucket expression: {}", expr))?
        {
            Predicate::Range(interval) => BucketRule::Range(interval),
            Predicate::OneOf(labels) => BucketRule::Labels(labels),
        };

        Ok(Self {
            name: name.to_string(),
            rule,
        })
    }
}

/// Check bucket names and ranges before any data is read
pub fn validate_buckets(buckets: &[TimepointBucket]) -> std::result::Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for bucket in buckets {
        if bucket.name.trim().is_empty() {
            return Err(PipelineError::EmptyBucketName);
        }
        if !seen.insert(bucket.name.as_str()) {
            return Err(PipelineError::DuplicateBucket(bucket.name.clone()));
        }
        if let BucketRule::Range(interval) = &bucket.rule {
            interval.validate(&bucket.name)?;
        }
    }
    Ok(())
}

/// Rows of a view that fall into one bucket
#[derive(Debug, Clone)]
pub struct BucketView<'a> {
    pub name: String,
    pub rows: View<'a>,
}

/// Partition (non-exclusively) a view into the configured buckets
pub fn bucketize<'a>(
    view: &View<'a>,
    column: &str,
    buckets: &[TimepointBucket],
) -> std::result::Result<Vec<BucketView<'a>>, PipelineError> {
    validate_buckets(buckets)?;
    let col = view.store().column_index(column, ColumnRole::Timepoint)?;

    let out: Vec<BucketView<'a>> = buckets
        .iter()
        .map(|bucket| BucketView {
            name: bucket.name.clone(),
            rows: view.retain_by(|row| bucket.rule.matches(row.get(col))),
        })
        .collect();

    for b in &out {
        tracing::debug!("Bucket '{}': {} row(s)", b.name, b.rows.len());
    }
    Ok(out)
}

/// One label bucket per distinct non-missing timepoint value
///
/// Numbers sort ascending ahead of text labels; text labels sort
/// lexicographically. Values are kept as written, so `01` and `1` get
/// separate buckets. Rows with a missing timepoint fall in no bucket.
pub fn distinct_buckets(
    view: &View<'_>,
    column: &str,
) -> std::result::Result<Vec<TimepointBucket>, PipelineError> {
    let col = view.store().column_index(column, ColumnRole::Timepoint)?;

    let mut values: Vec<Value> = Vec::new();
    for row in view.iter() {
        let value = row.get(col);
        if value.is_present() && !values.contains(value) {
            values.push(value.clone());
        }
    }
    values.sort_by(compare_timepoints);

    Ok(values
        .into_iter()
        .filter_map(|value| {
            let label = match value {
                Value::Number { raw, .. } | Value::Text(raw) => Label::Text(raw),
                Value::Missing => return None,
            };
            Some(TimepointBucket {
                name: label.to_string(),
                rule: BucketRule::Labels(vec![label]),
            })
        })
        .collect())
}

fn compare_timepoints(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number { value: x, raw: rx }, Value::Number { value: y, raw: ry }) => {
            x.total_cmp(y).then_with(|| rx.cmp(ry))
        }
        (Value::Number { .. }, _) => Ordering::Less,
        (_, Value::Number { .. }) => Ordering::Greater,
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

impl std::fmt::Display for BucketRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketRule::Range(interval) => {
                write!(f, "[{}, {}]", format_number(interval.lo), format_number(interval.hi))
            }
            BucketRule::Labels(labels) => {
                let joined: Vec<String> = labels.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
        }
    }
}
