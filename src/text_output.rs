//! Human-readable text report (default output format)

use crate::session::CountReport;

/// Render one section per timepoint with a variable/count table
pub fn render(report: &CountReport) -> String {
    let mut out = String::new();
    let table = &report.table;

    out.push_str("Counts of non-missing observations per variable at each timepoint\n");
    out.push_str(&format!(
        "Rows: {} of {} after filters\n",
        report.filtered_rows, report.total_rows
    ));

    if table.timepoints.is_empty() {
        out.push_str("\nNo timepoints to report.\n");
        return out;
    }

    let width = table
        .variables
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("Variable".len());

    for row in &table.timepoints {
        out.push_str(&format!("\nTimepoint: {} ({} rows)\n", row.timepoint, row.rows));
        out.push_str(&format!("{:<width$}  {:>7}\n", "Variable", "Count", width = width));
        out.push_str(&format!("{}\n", "─".repeat(width + 9)));
        for (variable, count) in table.entries(row) {
            out.push_str(&format!("{:<width$}  {:>7}\n", variable, count, width = width));
        }
    }

    out
}
