//! Per-subject attribute reconciliation
//!
//! Subject-level attributes (sex, graft type, prior surgery) are logically
//! constant across visits but are often recorded on a single row. For each
//! subject, missing cells are filled from the nearest earlier row that has a
//! value, then any leading gaps from the nearest later row. Row order is
//! never changed and subjects never borrow values from one another.

use crate::error::{ColumnRole, PipelineError};
use crate::record_store::RecordStore;
use crate::value::Value;
use std::collections::HashMap;

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of cells that received a propagated value
    pub cells_filled: usize,
    /// (subject, column) pairs with no value anywhere, left missing
    pub unresolved: usize,
    /// Number of distinct subjects seen
    pub subjects: usize,
}

/// Group row positions by subject id, in order of first appearance
///
/// Ids are compared as written in the dataset, never by numeric value.
/// Rows whose subject id is missing belong to no group.
pub fn subject_groups(store: &RecordStore, subject_col: usize) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (i, row) in store.rows().iter().enumerate() {
        let id = row.get(subject_col);
        if !id.is_present() {
            continue;
        }
        let slot = *by_key.entry(id.to_string()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    groups
}

/// Forward-fill then backward-fill `columns` within each subject
///
/// All column names are resolved before any cell is touched, so an unknown
/// column leaves the store unchanged.
pub fn reconcile(
    store: &mut RecordStore,
    subject_column: &str,
    columns: &[String],
) -> Result<ReconcileReport, PipelineError> {
    let subject_col = store.column_index(subject_column, ColumnRole::Subject)?;
    let targets = columns
        .iter()
        .map(|c| store.column_index(c, ColumnRole::ReconciledAttribute))
        .collect::<Result<Vec<_>, _>>()?;

    let groups = subject_groups(store, subject_col);
    let mut report = ReconcileReport {
        subjects: groups.len(),
        ..Default::default()
    };

    let rows = store.rows_mut();
    for &col in &targets {
        for group in &groups {
            let mut cells: Vec<Value> = group.iter().map(|&i| rows[i].get(col).clone()).collect();
            let Some(filled) = fill_forward_backward(&mut cells) else {
                report.unresolved += 1;
                continue;
            };
            if filled == 0 {
                continue;
            }
            report.cells_filled += filled;
            for (&i, value) in group.iter().zip(cells) {
                rows[i].set(col, value);
            }
        }
    }

    tracing::debug!(
        "Reconciled {} column(s) across {} subject(s): {} cell(s) filled, {} gap(s) unresolved",
        targets.len(),
        report.subjects,
        report.cells_filled,
        report.unresolved
    );
    if report.unresolved > 0 {
        tracing::warn!(
            "{} subject attribute(s) have no recorded value and remain missing",
            report.unresolved
        );
    }

    Ok(report)
}

/// Fill missing cells in place; returns the number filled, or `None` when
/// the sequence has no value to propagate
fn fill_forward_backward(cells: &mut [Value]) -> Option<usize> {
    let first = cells.iter().position(Value::is_present)?;
    let mut filled = 0;

    // Leading gap takes the first recorded value (backward fill)
    let leading = cells[first].clone();
    for cell in &mut cells[..first] {
        *cell = leading.clone();
        filled += 1;
    }

    let mut last = leading;
    for cell in &mut cells[first..] {
        if cell.is_present() {
            last = cell.clone();
        } else {
            *cell = last.clone();
            filled += 1;
        }
    }

    Some(filled)
}
