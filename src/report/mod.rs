//! Report module - xlsx output for merged data and analysis results

pub mod writer;

pub use writer::{write_level_report, write_sheets, ReportError};
