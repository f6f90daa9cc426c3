//! Completeness counting: non-missing observations per (timepoint, variable)

use crate::error::{ColumnRole, PipelineError};
use crate::record_store::View;
use crate::timepoint::BucketView;
use serde::{Deserialize, Serialize};

/// Count present values of each variable over a row subset
///
/// An empty subset yields a zero for every variable.
pub fn count_present(view: &View<'_>, variables: &[String]) -> Result<Vec<u64>, PipelineError> {
    let store = view.store();
    let cols = variables
        .iter()
        .map(|v| store.column_index(v, ColumnRole::Variable))
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = vec![0u64; cols.len()];
    for row in view.iter() {
        for (count, &col) in counts.iter_mut().zip(&cols) {
            if row.get(col).is_present() {
                *count += 1;
            }
        }
    }
    Ok(counts)
}

/// Counts for a single timepoint bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    /// Bucket name
    pub timepoint: String,
    /// Rows that fell into the bucket
    pub rows: u64,
    /// Present-value counts, aligned with `CountTable::variables`
    pub counts: Vec<u64>,
}

/// Bucket × variable completeness table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CountTable {
    pub variables: Vec<String>,
    pub timepoints: Vec<CountRow>,
}

impl CountTable {
    /// Count every variable in every bucket, preserving bucket order
    pub fn build(buckets: &[BucketView<'_>], variables: &[String]) -> Result<Self, PipelineError> {
        let mut timepoints = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            timepoints.push(CountRow {
                timepoint: bucket.name.clone(),
                rows: bucket.rows.len() as u64,
                counts: count_present(&bucket.rows, variables)?,
            });
        }

        Ok(Self {
            variables: variables.to_vec(),
            timepoints,
        })
    }

    /// Look up one (timepoint, variable) count
    pub fn count(&self, timepoint: &str, variable: &str) -> Option<u64> {
        let col = self.variables.iter().position(|v| v == variable)?;
        self.timepoints
            .iter()
            .find(|r| r.timepoint == timepoint)
            .map(|r| r.counts[col])
    }

    /// Timepoint names in display order
    pub fn timepoint_names(&self) -> impl Iterator<Item = &str> {
        self.timepoints.iter().map(|r| r.timepoint.as_str())
    }

    /// (variable, count) pairs for one row, in variable order
    pub fn entries<'a>(&'a self, row: &'a CountRow) -> impl Iterator<Item = (&'a str, u64)> + 'a {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(row.counts.iter().copied())
    }
}
