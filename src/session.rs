//! Session: a loaded, reconciled record store answering count requests
//!
//! The store is reconciled once when the session opens and is read-only
//! afterwards. Each request runs filter → bucket → count and either returns a
//! complete report or a configuration error; a failed request leaves the
//! session untouched and ready for the next one.

use crate::completeness::CountTable;
use crate::error::{ColumnRole, PipelineError};
use crate::filter::FilterSet;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::record_store::RecordStore;
use crate::timepoint::{bucketize, distinct_buckets, validate_buckets, TimepointBucket};
use serde::{Deserialize, Serialize};

/// One filter-and-count action
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountRequest {
    /// Variables to count, in display order
    pub variables: Vec<String>,
    /// Column holding elapsed time or phase labels
    pub timepoint_column: String,
    /// Bucket definitions; empty means one bucket per distinct timepoint value
    pub buckets: Vec<TimepointBucket>,
    pub filters: FilterSet,
}

/// Result of a count request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    /// Rows in the session's store
    pub total_rows: u64,
    /// Rows remaining after population filters
    pub filtered_rows: u64,
    #[serde(flatten)]
    pub table: CountTable,
}

/// A loaded dataset ready for repeated count requests
#[derive(Debug)]
pub struct Session {
    store: RecordStore,
    reconciliation: ReconcileReport,
}

impl Session {
    /// Take ownership of a store and reconcile subject attributes once
    pub fn open(
        mut store: RecordStore,
        subject_column: &str,
        reconciled_columns: &[String],
    ) -> Result<Self, PipelineError> {
        let reconciliation = reconcile(&mut store, subject_column, reconciled_columns)?;
        Ok(Self {
            store,
            reconciliation,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn reconciliation(&self) -> &ReconcileReport {
        &self.reconciliation
    }

    /// Run one request against the session's store
    pub fn run(&self, request: &CountRequest) -> Result<CountReport, PipelineError> {
        if request.variables.is_empty() {
            return Err(PipelineError::NoVariables);
        }

        // Resolve every referenced column up front so nothing partial is computed
        for variable in &request.variables {
            self.store.column_index(variable, ColumnRole::Variable)?;
        }
        self.store
            .column_index(&request.timepoint_column, ColumnRole::Timepoint)?;
        validate_buckets(&request.buckets)?;

        let filtered = request.filters.apply(&self.store)?;

        let derived;
        let buckets = if request.buckets.is_empty() {
            derived = distinct_buckets(&filtered, &request.timepoint_column)?;
            tracing::debug!(
                "No buckets configured; using {} distinct value(s) of '{}'",
                derived.len(),
                request.timepoint_column
            );
            &derived
        } else {
            &request.buckets
        };

        let bucketed = bucketize(&filtered, &request.timepoint_column, buckets)?;
        let table = CountTable::build(&bucketed, &request.variables)?;

        Ok(CountReport {
            total_rows: self.store.len() as u64,
            filtered_rows: filtered.len() as u64,
            table,
        })
    }
}
