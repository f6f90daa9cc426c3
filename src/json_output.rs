//! JSON output format for completeness reports
//!
//! `--format json` emits a single document describing the request that was
//! run and the resulting bucket × variable counts.

use crate::filter::ColumnFilter;
use crate::reconcile::ReconcileReport;
use crate::session::{CountReport, CountRequest};
use crate::timepoint::TimepointBucket;
use serde::{Deserialize, Serialize};

/// Summary of the reconciliation pass run when the session opened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReconciliation {
    /// Columns propagated across each subject's rows
    pub columns: Vec<String>,
    /// Distinct subjects in the dataset
    pub subjects: usize,
    /// Cells that received a propagated value
    pub cells_filled: usize,
    /// (subject, column) pairs with no recorded value
    pub unresolved: usize,
}

/// Request parameters echoed back with the counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRequest {
    pub timepoint_column: String,
    /// Configured buckets (empty when distinct values were used)
    pub buckets: Vec<TimepointBucket>,
    pub filters: Vec<ColumnFilter>,
}

/// Complete JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version for parsers
    pub version: String,
    /// Dataset path as given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    pub reconciliation: JsonReconciliation,
    pub request: JsonRequest,
    pub report: CountReport,
}

impl JsonOutput {
    pub fn new(
        dataset: Option<String>,
        reconciled_columns: &[String],
        reconciliation: &ReconcileReport,
        request: &CountRequest,
        report: CountReport,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            dataset,
            reconciliation: JsonReconciliation {
                columns: reconciled_columns.to_vec(),
                subjects: reconciliation.subjects,
                cells_filled: reconciliation.cells_filled,
                unresolved: reconciliation.unresolved,
            },
            request: JsonRequest {
                timepoint_column: request.timepoint_column.clone(),
                buckets: request.buckets.clone(),
                filters: request.filters.filters().to_vec(),
            },
            report,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completeness::{CountRow, CountTable};
    use crate::filter::FilterSet;

    #[test]
    fn test_json_document_shape() {
        let request = CountRequest {
            variables: vec!["ikdc".to_string()],
            timepoint_column: "days".to_string(),
            buckets: vec![TimepointBucket::range("3-4 months", 90.0, 120.0)],
            filters: FilterSet::all().with(ColumnFilter::one_of("sex", ["Female"])),
        };
        let report = CountReport {
            total_rows: 3,
            filtered_rows: 2,
            table: CountTable {
                variables: vec!["ikdc".to_string()],
                timepoints: vec![CountRow {
                    timepoint: "3-4 months".to_string(),
                    rows: 1,
                    counts: vec![0],
                }],
            },
        };
        let output = JsonOutput::new(
            Some("followup.csv".to_string()),
            &["sex".to_string()],
            &ReconcileReport {
                cells_filled: 2,
                unresolved: 0,
                subjects: 1,
            },
            &request,
            report,
        );

        let json: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();
        assert_eq!(json["dataset"], "followup.csv");
        assert_eq!(json["reconciliation"]["cells_filled"], 2);
        assert_eq!(json["request"]["buckets"][0]["name"], "3-4 months");
        assert_eq!(json["request"]["buckets"][0]["rule"]["range"][0], 90.0);
        assert_eq!(json["request"]["filters"][0]["predicate"]["one_of"][0], "Female");
        assert_eq!(json["report"]["timepoints"][0]["counts"][0], 0);
        assert_eq!(json["report"]["filtered_rows"], 2);
    }

    #[test]
    fn test_json_omits_missing_dataset() {
        let output = JsonOutput::new(
            None,
            &[],
            &ReconcileReport::default(),
            &CountRequest::default(),
            CountReport {
                total_rows: 0,
                filtered_rows: 0,
                table: CountTable::default(),
            },
        );
        let json = output.to_json().unwrap();
        assert!(!json.contains("\"dataset\""));
    }
}
