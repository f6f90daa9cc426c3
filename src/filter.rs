//! Population filtering for count requests
//!
//! Supports:
//! - Numeric ranges: `-f age=15..25` (inclusive, missing/non-numeric excluded)
//! - Allowed-value sets: `-f sex=Female` or `-f graft=BTB,HS`
//!
//! A row is kept only if it satisfies every predicate. Columns without a
//! predicate never exclude rows.

use crate::error::{ColumnRole, PipelineError};
use crate::record_store::{RecordStore, View};
use crate::value::{Interval, Label, Value};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Membership test applied to a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Inclusive numeric range
    Range(Interval),
    /// Allowed categorical values
    OneOf(Vec<Label>),
}

impl Predicate {
    /// Check a cell against this predicate; missing cells never match
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Range(interval) => interval.contains(value),
            Predicate::OneOf(labels) => labels.iter().any(|l| value.matches_label(l)),
        }
    }
}

/// A predicate bound to a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub predicate: Predicate,
}

impl ColumnFilter {
    pub fn range(column: impl Into<String>, lo: f64, hi: f64) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Range(Interval::new(lo, hi)),
        }
    }

    pub fn one_of<L: Into<Label>>(column: impl Into<String>, values: impl IntoIterator<Item = L>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::OneOf(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a filter expression like "age=15..25" or "sex=Female,Male"
    pub fn from_expr(expr: &str) -> Result<Self> {
        let Some((column, spec)) = expr.split_once('=') else {
            bail!(
                "Invalid filter expression: {}. Expected format: COLUMN=LO..HI or COLUMN=A,B",
                expr
            );
        };

        let column = column.trim();
        if column.is_empty() {
            bail!("Invalid filter expression: {}. Missing column name", expr);
        }

        let predicate = parse_predicate(spec)
            .with_context(|| format!("Invalid filter expression: {}", expr))?;

        Ok(Self {
            column: column.to_string(),
            predicate,
        })
    }

    /// Structural checks that need no data
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        match &self.predicate {
            Predicate::Range(interval) => interval.validate(&self.column),
            Predicate::OneOf(labels) if labels.is_empty() => {
                Err(PipelineError::EmptyValueSet(self.column.clone()))
            }
            Predicate::OneOf(_) => Ok(()),
        }
    }
}

/// Parse the right-hand side of `NAME=SPEC`, shared with timepoint buckets
///
/// `LO..HI` is a range when both sides are numbers; anything else is a
/// comma-separated value list.
pub(crate) fn parse_predicate(spec: &str) -> Result<Predicate> {
    let spec = spec.trim();
    if spec.is_empty() {
        bail!("empty value list");
    }

    if let Some((lo, hi)) = spec.split_once("..") {
        if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<f64>(), hi.trim().parse::<f64>()) {
            return Ok(Predicate::Range(Interval::new(lo, hi)));
        }
    }

    let labels: Vec<Label> = spec
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Label::parse)
        .collect();
    if labels.is_empty() {
        bail!("empty value list");
    }
    Ok(Predicate::OneOf(labels))
}

/// Conjunction of column filters, at most one per column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<ColumnFilter>,
}

impl FilterSet {
    /// A filter set with no constraints
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a filter; a later filter on the same column replaces the earlier one
    pub fn insert(&mut self, filter: ColumnFilter) {
        if let Some(existing) = self.filters.iter_mut().find(|f| f.column == filter.column) {
            *existing = filter;
        } else {
            self.filters.push(filter);
        }
    }

    pub fn with(mut self, filter: ColumnFilter) -> Self {
        self.insert(filter);
        self
    }

    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Select the rows that satisfy every filter
    ///
    /// Unknown columns and malformed predicates fail before any row is read.
    pub fn apply<'a>(&self, store: &'a RecordStore) -> std::result::Result<View<'a>, PipelineError> {
        self.apply_to(store.view())
    }

    /// Narrow an existing view
    pub fn apply_to<'a>(&self, view: View<'a>) -> std::result::Result<View<'a>, PipelineError> {
        let store = view.store();
        let mut bound = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            filter.validate()?;
            let col = store.column_index(&filter.column, ColumnRole::Filter)?;
            bound.push((col, &filter.predicate));
        }

        if bound.is_empty() {
            return Ok(view);
        }

        let before = view.len();
        let narrowed = view.retain_by(|row| bound.iter().all(|(col, p)| p.matches(row.get(*col))));
        tracing::debug!(
            "Filter kept {} of {} rows ({} predicate(s))",
            narrowed.len(),
            before,
            bound.len()
        );
        Ok(narrowed)
    }
}

impl FromIterator<ColumnFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = ColumnFilter>>(iter: I) -> Self {
        let mut set = FilterSet::all();
        for filter in iter {
            set.insert(filter);
        }
        set
    }
}
