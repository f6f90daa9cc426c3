//! Dashboard configuration loaded from TOML
//!
//! # Example TOML
//!
//! ```toml
//! subject_column = "record_id"
//! timepoint_column = "days_since_surgery"
//! reconciled_attribute_columns = ["sex_dashboard", "graft_dashboard2"]
//! variables = ["ikdc", "koos_qol"]
//!
//! [[bucket]]
//! name = "3-4 months"
//! range = [90, 120]
//!
//! [[filter]]
//! column = "sex_dashboard"
//! values = ["Female"]
//! ```
//!
//! Buckets and filters are arrays of tables, so their order in the file is
//! the order used for display and evaluation.

use crate::error::PipelineError;
use crate::filter::{ColumnFilter, FilterSet, Predicate};
use crate::session::CountRequest;
use crate::timepoint::{validate_buckets, BucketRule, TimepointBucket};
use crate::value::{Interval, Label};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A `[[bucket]]` table: `name` plus exactly one of `range` or `labels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
}

impl BucketSpec {
    pub fn to_bucket(&self) -> std::result::Result<TimepointBucket, PipelineError> {
        let rule = match (&self.range, &self.labels) {
            (Some(interval), None) => BucketRule::Range(*interval),
            (None, Some(labels)) => BucketRule::Labels(labels.clone()),
            _ => return Err(PipelineError::AmbiguousBucket(self.name.clone())),
        };
        Ok(TimepointBucket {
            name: self.name.clone(),
            rule,
        })
    }
}

impl From<&TimepointBucket> for BucketSpec {
    fn from(bucket: &TimepointBucket) -> Self {
        let (range, labels) = match &bucket.rule {
            BucketRule::Range(interval) => (Some(*interval), None),
            BucketRule::Labels(labels) => (None, Some(labels.clone())),
        };
        Self {
            name: bucket.name.clone(),
            range,
            labels,
        }
    }
}

/// A `[[filter]]` table: `column` plus exactly one of `range` or `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Label>>,
}

impl FilterSpec {
    pub fn to_filter(&self) -> std::result::Result<ColumnFilter, PipelineError> {
        let predicate = match (&self.range, &self.values) {
            (Some(interval), None) => Predicate::Range(*interval),
            (None, Some(values)) => Predicate::OneOf(values.clone()),
            _ => return Err(PipelineError::AmbiguousFilter(self.column.clone())),
        };
        let filter = ColumnFilter {
            column: self.column.clone(),
            predicate,
        };
        filter.validate()?;
        Ok(filter)
    }
}

impl From<&ColumnFilter> for FilterSpec {
    fn from(filter: &ColumnFilter) -> Self {
        let (range, values) = match &filter.predicate {
            Predicate::Range(interval) => (Some(*interval), None),
            Predicate::OneOf(values) => (None, Some(values.clone())),
        };
        Self {
            column: filter.column.clone(),
            range,
            values,
        }
    }
}

fn default_subject_column() -> String {
    "record_id".to_string()
}

/// Everything a count request needs, plus how to prepare the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// Column identifying the subject across visits
    #[serde(default = "default_subject_column")]
    pub subject_column: String,

    /// Column bucketed into timepoints
    pub timepoint_column: String,

    /// Subject-level columns propagated across visits
    #[serde(default)]
    pub reconciled_attribute_columns: Vec<String>,

    /// Variables to count, in display order
    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(default, rename = "bucket")]
    pub buckets: Vec<BucketSpec>,

    #[serde(default, rename = "filter")]
    pub filters: Vec<FilterSpec>,
}

impl DashboardConfig {
    /// Load a configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML, or fails
    /// structural validation.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content).with_context(|| {
            format!("Invalid dashboard config: {}", path.as_ref().display())
        })
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashboardConfig =
            toml::from_str(content).context("Failed to parse TOML dashboard config")?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration for the ACL follow-up registry export
    pub fn default_config() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../dashboard-default.toml");
        Self::from_toml_str(DEFAULT_TOML).context("Failed to parse embedded dashboard-default.toml")
    }

    /// Structural checks that need no data
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        validate_buckets(&self.bucket_definitions()?)?;
        self.filter_set()?;
        Ok(())
    }

    pub fn bucket_definitions(&self) -> std::result::Result<Vec<TimepointBucket>, PipelineError> {
        self.buckets.iter().map(BucketSpec::to_bucket).collect()
    }

    pub fn filter_set(&self) -> std::result::Result<FilterSet, PipelineError> {
        let mut set = FilterSet::all();
        for spec in &self.filters {
            set.insert(spec.to_filter()?);
        }
        Ok(set)
    }

    /// Build the count request described by this configuration
    pub fn to_request(&self) -> std::result::Result<CountRequest, PipelineError> {
        Ok(CountRequest {
            variables: self.variables.clone(),
            timepoint_column: self.timepoint_column.clone(),
            buckets: self.bucket_definitions()?,
            filters: self.filter_set()?,
        })
    }

    /// Render back to TOML (used by `--print-config`)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize dashboard config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
subject_column = "record_id"
timepoint_column = "days"
reconciled_attribute_columns = ["sex_dashboard"]
variables = ["ikdc", "tsk"]

[[bucket]]
name = "3-4 months"
range = [90, 120]

[[bucket]]
name = "Pre-op"
labels = ["baseline", 0]

[[filter]]
column = "sex_dashboard"
values = ["Female"]

[[filter]]
column = "age"
range = [14.5, 25]
"#;

    #[test]
    fn test_default_config_loads() {
        let config = DashboardConfig::default_config().expect("embedded config must parse");
        assert_eq!(config.subject_column, "record_id");
        assert_eq!(
            config.reconciled_attribute_columns,
            vec!["sex_dashboard", "graft_dashboard2", "prior_aclr"]
        );
        assert_eq!(config.variables.len(), 29);
        assert_eq!(config.variables[1], "ikdc");
        assert!(config.buckets.is_empty());
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        let config = DashboardConfig::from_toml_str(SAMPLE).unwrap();
        let request = config.to_request().unwrap();

        assert_eq!(request.timepoint_column, "days");
        assert_eq!(
            request.buckets,
            vec![
                TimepointBucket::range("3-4 months", 90.0, 120.0),
                TimepointBucket::labels("Pre-op", [Label::from("baseline"), Label::Number(0.0)]),
            ]
        );
        assert_eq!(request.filters.filters().len(), 2);
        assert_eq!(
            request.filters.filters()[1],
            ColumnFilter::range("age", 14.5, 25.0)
        );
    }

    #[test]
    fn test_subject_column_defaults() {
        let config = DashboardConfig::from_toml_str("timepoint_column = \"days\"").unwrap();
        assert_eq!(config.subject_column, "record_id");
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_bucket_needs_exactly_one_rule() {
        let both = r#"
timepoint_column = "days"
[[bucket]]
name = "x"
range = [1, 2]
labels = ["a"]
"#;
        let err = DashboardConfig::from_toml_str(both).unwrap_err();
        assert!(err.to_string().contains("exactly one"), "{err:#}");

        let neither = "timepoint_column = \"days\"\n[[bucket]]\nname = \"x\"\n";
        assert!(DashboardConfig::from_toml_str(neither).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let input = "timepoint_column = \"days\"\n[[filter]]\ncolumn = \"age\"\nrange = [30, 10]\n";
        let err = DashboardConfig::from_toml_str(input).unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = "timepoint_column = \"days\"\nvariabels = [\"ikdc\"]\n";
        assert!(DashboardConfig::from_toml_str(input).is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = DashboardConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.buckets.len(), 2);
    }

    #[test]
    fn test_from_toml_missing_file() {
        let err = DashboardConfig::from_toml("/nonexistent/dashboard.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_toml_round_trip_keeps_order() {
        let config = DashboardConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = DashboardConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
