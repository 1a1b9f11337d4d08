//! Analysis module - column detection and aggregation over merged bug data

pub mod breakdown;
pub mod levels;
pub mod summary;

pub use levels::LevelAnalysis;

use crate::config::AnalysisConfig;
use crate::data::column_names;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no {0} column detected in the data")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Columns of interest located by keyword containment.
#[derive(Debug, Clone, Default)]
pub struct DetectedColumns {
    pub source: Option<String>,
    pub severity: Option<String>,
    pub bug_type: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
}

fn find_by_keywords(names: &[String], keywords: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
        })
        .cloned()
}

/// Locate the source/severity/type/status/date columns. The first column
/// (in sheet order) containing a keyword wins, so original data columns
/// take precedence over appended metadata.
pub fn detect_columns(df: &DataFrame, cfg: &AnalysisConfig) -> DetectedColumns {
    let names = column_names(df);
    DetectedColumns {
        source: find_by_keywords(&names, &cfg.source_keywords),
        severity: find_by_keywords(&names, &cfg.severity_keywords),
        bug_type: find_by_keywords(&names, &cfg.type_keywords),
        status: find_by_keywords(&names, &cfg.status_keywords),
        date: find_by_keywords(&names, &cfg.date_keywords),
    }
}

/// Map a raw bug-type value onto the canonical program/non-program labels.
/// Anything unrecognized counts as non-program, matching the ingest default.
pub fn normalize_type(raw: Option<&str>, cfg: &AnalysisConfig) -> String {
    let Some(raw) = raw else {
        return cfg.non_program_label.clone();
    };
    let raw = raw.trim();
    if let Some(canonical) = cfg.type_aliases.get(raw) {
        return canonical.clone();
    }
    if raw == cfg.program_label || raw == cfg.non_program_label {
        return raw.to_string();
    }
    cfg.non_program_label.clone()
}

/// Map a raw fix-status value onto the canonical fixed/unfixed labels.
pub fn normalize_status(raw: Option<&str>, cfg: &AnalysisConfig) -> String {
    let Some(raw) = raw else {
        return cfg.unfixed_label.clone();
    };
    let raw = raw.trim();
    if let Some(canonical) = cfg.status_aliases.get(raw) {
        return canonical.clone();
    }
    if raw == cfg.fixed_label || raw == cfg.unfixed_label {
        return raw.to_string();
    }
    cfg.unfixed_label.clone()
}

/// Percentage `part / whole * 100` rounded to two decimals, zero when the
/// denominator is zero.
pub(crate) fn rate_percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    #[test]
    fn detection_prefers_earlier_columns() {
        let df = DataFrame::new(vec![
            Column::new("严重级别".into(), vec!["S-严重"]),
            Column::new("Severity (copy)".into(), vec!["S"]),
            Column::new("Source File".into(), vec!["a.xlsx"]),
        ])
        .unwrap();
        let cfg = AnalysisConfig::default();
        let detected = detect_columns(&df, &cfg);
        assert_eq!(detected.severity.as_deref(), Some("严重级别"));
        assert_eq!(detected.source.as_deref(), Some("Source File"));
        assert!(detected.date.is_none());
    }

    #[test]
    fn type_and_status_normalization() {
        let cfg = AnalysisConfig::default();
        assert_eq!(normalize_type(Some("程序Bug"), &cfg), cfg.program_label);
        assert_eq!(normalize_type(Some("whatever"), &cfg), cfg.non_program_label);
        assert_eq!(normalize_type(None, &cfg), cfg.non_program_label);
        assert_eq!(normalize_status(Some("已修复"), &cfg), cfg.fixed_label);
        assert_eq!(normalize_status(Some("Fixed"), &cfg), cfg.fixed_label);
        assert_eq!(normalize_status(None, &cfg), cfg.unfixed_label);
    }

    #[test]
    fn zero_denominator_rate_is_zero() {
        assert_eq!(rate_percent(3, 0), 0.0);
        assert_eq!(rate_percent(1, 3), 33.33);
    }
}
