//! Data Cleaner Module
//! Strips spreadsheet artifacts and fills in the inferred categorical columns.

use crate::config::AppConfig;
use crate::data::{cell_text, column_names};
use polars::prelude::*;
use tracing::info;

/// Drop columns whose name contains one of the configured artifact patterns
/// (`Unnamed:` headers produced by blank header cells).
pub fn remove_unnamed_columns(df: &DataFrame, cfg: &AppConfig) -> PolarsResult<DataFrame> {
    let patterns = &cfg.cleaning.unnamed_column_patterns;
    let doomed: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| patterns.iter().any(|p| name.contains(p.as_str())))
        .collect();

    if doomed.is_empty() {
        return Ok(df.clone());
    }

    info!(columns = ?doomed, "Dropping artifact columns");
    let mut out = df.clone();
    for name in &doomed {
        out = out.drop(name)?;
    }
    Ok(out)
}

fn row_is_blank(df: &DataFrame, row: usize) -> PolarsResult<bool> {
    for column in df.get_columns() {
        if cell_text(&column.get(row)?).is_some() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Drop rows where every cell is null or blank.
pub fn remove_empty_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut keep = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        keep.push(!row_is_blank(df, row)?);
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    df.filter(&mask)
}

/// Drop columns that hold no value in any row.
pub fn remove_empty_columns(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut doomed: Vec<String> = Vec::new();
    for column in df.get_columns() {
        let mut has_value = false;
        for row in 0..df.height() {
            if cell_text(&column.get(row)?).is_some() {
                has_value = true;
                break;
            }
        }
        if !has_value {
            doomed.push(column.name().to_string());
        }
    }

    let mut out = df.clone();
    for name in &doomed {
        out = out.drop(name)?;
    }
    Ok(out)
}

/// Full cleaning pass. If removing empties would erase the frame entirely,
/// the artifact-stripped original is returned instead so no data is lost.
pub fn clean(df: &DataFrame, cfg: &AppConfig) -> PolarsResult<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }

    let no_artifacts = remove_unnamed_columns(df, cfg)?;

    let mut out = no_artifacts.clone();
    if cfg.cleaning.remove_empty_rows {
        out = remove_empty_rows(&out)?;
    }
    if cfg.cleaning.remove_empty_columns {
        out = remove_empty_columns(&out)?;
    }

    if out.height() == 0 || out.width() == 0 {
        return Ok(no_artifacts);
    }

    info!(
        rows_before = df.height(),
        rows_after = out.height(),
        cols_before = df.width(),
        cols_after = out.width(),
        "Cleaning pass complete"
    );
    Ok(out)
}

/// Ensure the inferred bug-type and fix-status columns exist.
///
/// Existing columns are recognized by keyword (so a Chinese 修复状态 header
/// counts as the status column). A missing type column defaults every row
/// to non-program bug; a missing status column defaults to unfixed, and
/// blanks in an existing status column are filled with the unfixed label.
pub fn add_analysis_columns(df: &DataFrame, cfg: &AppConfig) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    let analysis = &cfg.analysis;
    let detected = crate::analysis::detect_columns(&out, analysis);

    if detected.bug_type.is_none() {
        let values = vec![analysis.non_program_label.clone(); out.height()];
        out.with_column(Series::new(analysis.type_column.as_str().into(), values))?;
        info!(column = %analysis.type_column, default = %analysis.non_program_label, "Type column added");
    }

    match detected.status {
        None => {
            let values = vec![analysis.unfixed_label.clone(); out.height()];
            out.with_column(Series::new(analysis.status_column.as_str().into(), values))?;
            info!(column = %analysis.status_column, default = %analysis.unfixed_label, "Status column added");
        }
        Some(name) => {
            let column = out.column(&name)?;
            let mut filled = Vec::with_capacity(out.height());
            for row in 0..out.height() {
                filled.push(
                    cell_text(&column.get(row)?).unwrap_or_else(|| analysis.unfixed_label.clone()),
                );
            }
            out.with_column(Series::new(name.as_str().into(), filled))?;
        }
    }

    Ok(out)
}

/// Append provenance columns: the source filename and the processing timestamp.
pub fn add_metadata_columns(
    df: &DataFrame,
    source: &std::path::Path,
    cfg: &AppConfig,
) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    let report = &cfg.report;

    if report.include_source_column {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let values = vec![name; out.height()];
        out.with_column(Series::new(report.source_column.as_str().into(), values))?;
    }

    if report.include_timestamp {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let values = vec![stamp; out.height()];
        out.with_column(Series::new(report.timestamp_column.as_str().into(), values))?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_frame(cols: &[(&str, Vec<Option<&str>>)]) -> DataFrame {
        let columns: Vec<Column> = cols
            .iter()
            .map(|(name, values)| {
                let owned: Vec<Option<String>> =
                    values.iter().map(|v| v.map(|s| s.to_string())).collect();
                Column::new((*name).into(), owned)
            })
            .collect();
        DataFrame::new(columns).expect("frame")
    }

    #[test]
    fn unnamed_columns_are_dropped() {
        let cfg = AppConfig::default();
        let df = text_frame(&[
            ("Bug ID", vec![Some("1"), Some("2")]),
            ("Unnamed: 3", vec![Some("x"), None]),
        ]);
        let cleaned = remove_unnamed_columns(&df, &cfg).unwrap();
        assert_eq!(cleaned.width(), 1);
        assert!(cleaned.column("Bug ID").is_ok());
    }

    #[test]
    fn blank_rows_are_dropped() {
        let df = text_frame(&[
            ("A", vec![Some("1"), None, Some("3")]),
            ("B", vec![None, None, Some("b")]),
        ]);
        let cleaned = remove_empty_rows(&df).unwrap();
        assert_eq!(cleaned.height(), 2);
    }

    #[test]
    fn all_null_columns_are_dropped() {
        let df = text_frame(&[
            ("A", vec![Some("1"), Some("2")]),
            ("B", vec![None, None]),
        ]);
        let cleaned = remove_empty_columns(&df).unwrap();
        assert_eq!(cleaned.width(), 1);
    }

    #[test]
    fn clean_falls_back_when_everything_is_empty() {
        let cfg = AppConfig::default();
        let df = text_frame(&[("A", vec![None, None])]);
        let cleaned = clean(&df, &cfg).unwrap();
        // Fallback keeps the artifact-stripped original rather than an empty frame
        assert_eq!(cleaned.width(), 1);
        assert_eq!(cleaned.height(), 2);
    }

    #[test]
    fn analysis_columns_get_defaults() {
        let cfg = AppConfig::default();
        let df = text_frame(&[
            ("Bug ID", vec![Some("1"), Some("2")]),
            ("Fix Status", vec![Some("Fixed"), None]),
        ]);
        let out = add_analysis_columns(&df, &cfg).unwrap();

        let types = crate::data::column_values(&out, &cfg.analysis.type_column).unwrap();
        assert!(types
            .iter()
            .all(|v| v.as_deref() == Some(cfg.analysis.non_program_label.as_str())));

        let status = crate::data::column_values(&out, &cfg.analysis.status_column).unwrap();
        assert_eq!(status[0].as_deref(), Some("Fixed"));
        assert_eq!(status[1].as_deref(), Some(cfg.analysis.unfixed_label.as_str()));
    }

    #[test]
    fn metadata_columns_record_the_source() {
        let cfg = AppConfig::default();
        let df = text_frame(&[("A", vec![Some("1")])]);
        let out =
            add_metadata_columns(&df, std::path::Path::new("/in/bug记录0804.xlsx"), &cfg).unwrap();
        let sources = crate::data::column_values(&out, &cfg.report.source_column).unwrap();
        assert_eq!(sources[0].as_deref(), Some("bug记录0804.xlsx"));
        assert!(out.column(&cfg.report.timestamp_column).is_ok());
    }
}
