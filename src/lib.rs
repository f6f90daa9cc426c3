//! followup-dash - completeness counts for longitudinal follow-up data
//!
//! This library loads a clinical-research export with one row per subject
//! visit, propagates subject-level attributes across each subject's rows,
//! narrows the population with categorical and numeric-range filters, groups
//! rows into timepoint buckets, and counts the non-missing observations of
//! each variable per bucket.

pub mod cli;
pub mod completeness;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod json_output;
pub mod reconcile;
pub mod record_store;
pub mod session;
pub mod text_output;
pub mod timepoint;
pub mod value;
