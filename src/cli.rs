//! CLI argument parsing for followup-dash

use crate::config::{BucketSpec, DashboardConfig, FilterSpec};
use crate::filter::ColumnFilter;
use crate::timepoint::TimepointBucket;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for completeness reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "followup-dash")]
#[command(version)]
#[command(about = "Count non-missing follow-up observations per variable and timepoint", long_about = None)]
pub struct Cli {
    /// Dataset to load (.csv or .json export)
    #[arg(value_name = "DATA", required_unless_present = "print_config")]
    pub data: Option<PathBuf>,

    /// Dashboard configuration file (defaults to the built-in registry layout)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Column identifying subjects across visits
    #[arg(long = "subject-column", value_name = "COLUMN")]
    pub subject_column: Option<String>,

    /// Column holding elapsed time or phase labels
    #[arg(short = 't', long = "timepoint-column", value_name = "COLUMN")]
    pub timepoint_column: Option<String>,

    /// Subject-level columns to propagate across visits (comma-separated)
    #[arg(long = "reconcile", value_name = "COLUMNS", value_delimiter = ',')]
    pub reconcile: Option<Vec<String>>,

    /// Skip attribute reconciliation
    #[arg(long = "no-reconcile", conflicts_with = "reconcile")]
    pub no_reconcile: bool,

    /// Variables to count (comma-separated, replaces the configured list)
    #[arg(short = 'v', long = "variables", value_name = "VARS", value_delimiter = ',')]
    pub variables: Option<Vec<String>>,

    /// Population filter, repeatable (e.g., -f age=15..25 or -f sex_dashboard=Female)
    #[arg(short = 'f', long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Timepoint bucket, repeatable (e.g., -b "3-4 months=90..120"); replaces configured buckets
    #[arg(short = 'b', long = "bucket", value_name = "EXPR", conflicts_with = "distinct")]
    pub buckets: Vec<String>,

    /// Use one bucket per distinct timepoint value, ignoring configured buckets
    #[arg(long = "distinct")]
    pub distinct: bool,

    /// Include the per-timepoint row count column in CSV output
    #[arg(long = "row-totals")]
    pub row_totals: bool,

    /// Print the dataset's column names and exit
    #[arg(long = "list-columns")]
    pub list_columns: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long = "print-config")]
    pub print_config: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Overlay command-line overrides onto a loaded configuration
    ///
    /// Command-line filters replace configured filters on the same column and
    /// add the rest; command-line buckets replace the configured bucket list.
    pub fn apply_to(&self, config: &mut DashboardConfig) -> Result<()> {
        if let Some(subject) = &self.subject_column {
            config.subject_column = subject.clone();
        }
        if let Some(timepoint) = &self.timepoint_column {
            config.timepoint_column = timepoint.clone();
        }
        if let Some(columns) = &self.reconcile {
            config.reconciled_attribute_columns = trimmed(columns);
        }
        if self.no_reconcile {
            config.reconciled_attribute_columns.clear();
        }
        if let Some(variables) = &self.variables {
            config.variables = trimmed(variables);
        }

        for expr in &self.filters {
            let spec = FilterSpec::from(&ColumnFilter::from_expr(expr)?);
            match config.filters.iter_mut().find(|f| f.column == spec.column) {
                Some(existing) => *existing = spec,
                None => config.filters.push(spec),
            }
        }

        if self.distinct {
            config.buckets.clear();
        } else if !self.buckets.is_empty() {
            config.buckets = self
                .buckets
                .iter()
                .map(|expr| TimepointBucket::from_expr(expr).map(|b| BucketSpec::from(&b)))
                .collect::<Result<_>>()?;
        }

        config.validate()?;
        Ok(())
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> DashboardConfig {
        DashboardConfig::from_toml_str(
            r#"
timepoint_column = "days"
reconciled_attribute_columns = ["sex_dashboard"]
variables = ["ikdc"]

[[bucket]]
name = "3-4 months"
range = [90, 120]

[[filter]]
column = "age"
range = [10, 20]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cli_parses_data_path() {
        let cli = Cli::parse_from(["followup-dash", "followup.csv"]);
        assert_eq!(cli.data, Some(PathBuf::from("followup.csv")));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_requires_data() {
        assert!(Cli::try_parse_from(["followup-dash"]).is_err());
    }

    #[test]
    fn test_cli_print_config_without_data() {
        let cli = Cli::parse_from(["followup-dash", "--print-config"]);
        assert!(cli.print_config);
        assert!(cli.data.is_none());
    }

    #[test]
    fn test_cli_variables_comma_separated() {
        let cli = Cli::parse_from(["followup-dash", "d.csv", "-v", "ikdc,marx,tsk"]);
        assert_eq!(
            cli.variables,
            Some(vec!["ikdc".to_string(), "marx".to_string(), "tsk".to_string()])
        );
    }

    #[test]
    fn test_cli_repeatable_filters() {
        let cli = Cli::parse_from([
            "followup-dash",
            "d.csv",
            "-f",
            "age=15..25",
            "--filter",
            "sex_dashboard=Female",
        ]);
        assert_eq!(cli.filters.len(), 2);
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["followup-dash", "d.csv", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_bucket_conflicts_with_distinct() {
        let result = Cli::try_parse_from(["followup-dash", "d.csv", "-b", "a=1..2", "--distinct"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_overrides_replace_and_add() {
        let cli = Cli::parse_from([
            "followup-dash",
            "d.csv",
            "-t",
            "phase",
            "-v",
            "marx, tsk",
            "-f",
            "age=12..18",
            "-f",
            "graft=BTB",
            "-b",
            "Pre-op=baseline",
        ]);
        let mut config = base_config();
        cli.apply_to(&mut config).unwrap();

        assert_eq!(config.timepoint_column, "phase");
        assert_eq!(config.variables, vec!["marx", "tsk"]);
        assert_eq!(config.filters.len(), 2);
        assert_eq!(config.filters[0].range.map(|r| r.lo), Some(12.0));
        assert_eq!(config.filters[1].column, "graft");
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].name, "Pre-op");
    }

    #[test]
    fn test_apply_no_reconcile_and_distinct() {
        let cli = Cli::parse_from(["followup-dash", "d.csv", "--no-reconcile", "--distinct"]);
        let mut config = base_config();
        cli.apply_to(&mut config).unwrap();
        assert!(config.reconciled_attribute_columns.is_empty());
        assert!(config.buckets.is_empty());
    }

    #[test]
    fn test_apply_rejects_bad_filter_expr() {
        let cli = Cli::parse_from(["followup-dash", "d.csv", "-f", "age"]);
        let mut config = base_config();
        assert!(cli.apply_to(&mut config).is_err());
    }

    #[test]
    fn test_apply_rejects_inverted_bucket() {
        let cli = Cli::parse_from(["followup-dash", "d.csv", "-b", "late=200..100"]);
        let mut config = base_config();
        assert!(cli.apply_to(&mut config).is_err());
    }
}
