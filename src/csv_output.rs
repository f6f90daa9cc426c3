//! CSV output for completeness tables
//!
//! One row per timepoint bucket, one column per variable, for spreadsheet
//! analysis and machine parsing.

use crate::completeness::CountTable;
use crate::session::CountReport;

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    include_row_totals: bool,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new(include_row_totals: bool) -> Self {
        Self { include_row_totals }
    }

    /// Generate CSV header row based on enabled flags
    fn header(&self, table: &CountTable) -> String {
        let mut headers = vec![Self::escape_field("timepoint")];

        if self.include_row_totals {
            headers.push("rows".to_string());
        }

        headers.extend(table.variables.iter().map(|v| Self::escape_field(v)));
        headers.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        // If field contains comma, quote, or newline, wrap in quotes and escape quotes
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Generate CSV output as string
    pub fn to_csv(&self, report: &CountReport) -> String {
        let table = &report.table;
        let mut output = String::new();

        output.push_str(&self.header(table));
        output.push('\n');

        for row in &table.timepoints {
            let mut fields = vec![Self::escape_field(&row.timepoint)];
            if self.include_row_totals {
                fields.push(row.rows.to_string());
            }
            fields.extend(row.counts.iter().map(u64::to_string));
            output.push_str(&fields.join(","));
            output.push('\n');
        }

        output
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new(false)
    }
}
