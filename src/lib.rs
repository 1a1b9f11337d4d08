//! Bugsheet - Excel bug-report merging & analysis
//!
//! Ingests per-tester bug spreadsheets, cleans and merges them, and writes
//! multi-sheet xlsx reports: a detailed unified report, a severity-level
//! pivot and per-date/per-type breakdowns.

pub mod analysis;
pub mod config;
pub mod data;
pub mod filename;
pub mod pipeline;
pub mod report;
pub mod validate;
