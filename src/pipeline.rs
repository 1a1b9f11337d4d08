//! Pipeline Module
//! End-to-end runs: ingest workbooks, merge, analyze and write reports.

use crate::analysis::{breakdown, levels, summary, AnalysisError, LevelAnalysis};
use crate::config::AppConfig;
use crate::data::{
    cleaner, discover_workbooks, merge_frames, read_sheet, read_workbook, ReaderError,
};
use crate::report::{write_level_report, write_sheets, ReportError};
use polars::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no input workbooks found")]
    NoInput,
    #[error("no rows survived cleaning")]
    EmptyData,
    #[error("no report matching '{0}*' found, run an analysis first")]
    NoReport(String),
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Paths produced by a batch run.
#[derive(Debug)]
pub struct BatchOutputs {
    pub merged: PathBuf,
    pub statistics: PathBuf,
    pub report: PathBuf,
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn ensure_output_dir(cfg: &AppConfig) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(&cfg.output_dir)?;
    Ok(cfg.output_dir.clone())
}

/// Read one workbook and run the full per-file preparation: clean, fill the
/// inferred categorical columns, append provenance columns.
pub fn prepare_frame(path: &Path, cfg: &AppConfig) -> Result<DataFrame, PipelineError> {
    let raw = read_workbook(path, cfg)?;
    let cleaned = cleaner::clean(&raw, cfg)?;
    let typed = cleaner::add_analysis_columns(&cleaned, cfg)?;
    let framed = cleaner::add_metadata_columns(&typed, path, cfg)?;
    info!(
        file = %path.display(),
        rows = framed.height(),
        columns = framed.width(),
        "Workbook prepared"
    );
    Ok(framed)
}

/// Expand the given paths: directories are scanned for workbooks, files are
/// taken as-is when supported.
fn collect_inputs(paths: &[PathBuf], cfg: &AppConfig) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            inputs.extend(discover_workbooks(path, cfg));
        } else if cfg.is_supported_file(path) {
            inputs.push(path.clone());
        } else {
            warn!(path = %path.display(), "Unsupported input skipped");
        }
    }
    inputs
}

/// Batch run: merge every workbook under the given paths into one detailed
/// report plus a merged-data workbook and a statistics workbook.
pub fn run_batch(paths: &[PathBuf], cfg: &AppConfig) -> Result<BatchOutputs, PipelineError> {
    let inputs = collect_inputs(paths, cfg);
    if inputs.is_empty() {
        return Err(PipelineError::NoInput);
    }

    // Workbook parsing dominates the run time, so read in parallel.
    let results: Vec<(PathBuf, Result<DataFrame, PipelineError>)> = inputs
        .par_iter()
        .map(|path| (path.clone(), prepare_frame(path, cfg)))
        .collect();

    let mut frames = Vec::with_capacity(results.len());
    let mut processed = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(frame) => {
                processed.push(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_string(),
                );
                frames.push(frame);
            }
            Err(e) => error!(file = %path.display(), error = %e, "Workbook failed, skipping"),
        }
    }
    if frames.is_empty() {
        return Err(PipelineError::NoInput);
    }

    let merged = merge_frames(&frames)?;
    if merged.height() == 0 {
        return Err(PipelineError::EmptyData);
    }

    let out_dir = ensure_output_dir(cfg)?;
    let ts = timestamp();

    let merged_path = out_dir.join(format!("merged_data_{ts}.xlsx"));
    write_sheets(&merged_path, &[("Merged Data".to_string(), &merged)])?;

    let stats = summary::batch_statistics(&merged, &processed, cfg)?;
    let stats_path = out_dir.join(format!("data_statistics_{ts}.xlsx"));
    write_sheets(&stats_path, &[("Statistics".to_string(), &stats)])?;

    let source_info = format!("{} files", processed.len());
    let analysis_stats = summary::dataset_summary(&merged, Some(&source_info), None, cfg)?;
    let report_path = out_dir.join(format!("{}_batch_{ts}.xlsx", cfg.report.report_prefix));
    write_sheets(
        &report_path,
        &[
            (cfg.report.detailed_sheet.clone(), &merged),
            (cfg.report.stats_sheet.clone(), &analysis_stats),
        ],
    )?;

    info!(
        files = processed.len(),
        rows = merged.height(),
        report = %report_path.display(),
        "Batch run complete"
    );
    Ok(BatchOutputs {
        merged: merged_path,
        statistics: stats_path,
        report: report_path,
    })
}

/// Single-file run: one workbook becomes one detailed report with a
/// statistics sheet.
pub fn run_single(path: &Path, cfg: &AppConfig) -> Result<PathBuf, PipelineError> {
    let raw = read_workbook(path, cfg)?;
    let original_shape = (raw.height(), raw.width());
    let cleaned = cleaner::clean(&raw, cfg)?;

    let out_dir = ensure_output_dir(cfg)?;
    let ts = timestamp();
    let report_path = out_dir.join(format!("{}_{ts}.xlsx", cfg.report.report_prefix));

    if cleaned.height() == 0 || cleaned.width() == 0 {
        warn!(file = %path.display(), "Workbook is empty after cleaning");
        let note = DataFrame::new(vec![Column::new(
            "Note".into(),
            vec!["The source workbook contained no usable rows".to_string()],
        )])?;
        let stats = summary::dataset_summary(&cleaned, path.to_str(), Some(original_shape), cfg)?;
        write_sheets(
            &report_path,
            &[
                (cfg.report.detailed_sheet.clone(), &note),
                (cfg.report.stats_sheet.clone(), &stats),
            ],
        )?;
        return Ok(report_path);
    }

    let typed = cleaner::add_analysis_columns(&cleaned, cfg)?;
    let framed = cleaner::add_metadata_columns(&typed, path, cfg)?;
    let stats = summary::dataset_summary(&framed, path.to_str(), Some(original_shape), cfg)?;
    write_sheets(
        &report_path,
        &[
            (cfg.report.detailed_sheet.clone(), &framed),
            (cfg.report.stats_sheet.clone(), &stats),
        ],
    )?;

    info!(file = %path.display(), report = %report_path.display(), "Single-file run complete");
    Ok(report_path)
}

/// Most recently modified report whose filename starts with `prefix`.
pub fn find_latest_report(dir: &Path, prefix: &str) -> Result<PathBuf, PipelineError> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) || !name.ends_with(".xlsx") || name.starts_with("~$") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, path));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| PipelineError::NoReport(prefix.to_string()))
}

fn resolve_report(report: Option<PathBuf>, cfg: &AppConfig) -> Result<PathBuf, PipelineError> {
    match report {
        Some(path) => Ok(path),
        None => {
            let found = find_latest_report(&cfg.output_dir, &cfg.report.report_prefix)?;
            info!(report = %found.display(), "Using latest report");
            Ok(found)
        }
    }
}

fn read_report_data(path: &Path, cfg: &AppConfig) -> Result<DataFrame, PipelineError> {
    let df = read_sheet(path, &[cfg.report.detailed_sheet.as_str(), "Merged Data"])?;
    if df.height() == 0 {
        return Err(PipelineError::EmptyData);
    }
    Ok(df)
}

/// Severity-level analysis over an existing report (the latest one when no
/// path is given). Writes the pivot workbook and returns its path.
pub fn run_levels(report: Option<PathBuf>, cfg: &AppConfig) -> Result<PathBuf, PipelineError> {
    let report_path = resolve_report(report, cfg)?;
    let df = read_report_data(&report_path, cfg)?;

    let analysis = LevelAnalysis::compute(&df, cfg)?;
    for row in &analysis.rows {
        info!(
            source = %row.label,
            total = row.total,
            program = row.program,
            fixed = row.program_fixed,
            "Severity counts"
        );
    }

    let report_name = report_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let summary_df = levels::level_summary_frame(&analysis, report_name)?;

    let out_dir = ensure_output_dir(cfg)?;
    let out_path = out_dir.join(format!("level_report_{}.xlsx", timestamp()));
    write_level_report(&out_path, &analysis, &summary_df)?;
    Ok(out_path)
}

/// Per-date and per-type breakdown over an existing report. The by-date sheet
/// is skipped with a warning when no date column can be detected.
pub fn run_breakdown(report: Option<PathBuf>, cfg: &AppConfig) -> Result<PathBuf, PipelineError> {
    let report_path = resolve_report(report, cfg)?;
    let df = read_report_data(&report_path, cfg)?;

    let by_date = match breakdown::by_date(&df, cfg) {
        Ok(frame) => Some(frame),
        Err(AnalysisError::MissingColumn(which)) => {
            warn!(column = which, "Column not detected, by-date sheet skipped");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let by_type = breakdown::by_type(&df, cfg)?;

    let report_name = report_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let summary_df = summary::dataset_summary(&df, Some(&report_name), None, cfg)?;

    let mut sheets: Vec<(String, &DataFrame)> = Vec::new();
    if let Some(frame) = &by_date {
        sheets.push(("By Date".to_string(), frame));
    }
    sheets.push(("By Type".to_string(), &by_type));
    sheets.push(("Raw Data".to_string(), &df));
    sheets.push(("Summary".to_string(), &summary_df));

    let out_dir = ensure_output_dir(cfg)?;
    let out_path = out_dir.join(format!("bug_analysis_{}.xlsx", timestamp()));
    write_sheets(&out_path, &sheets)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_report_is_found_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("detailed_report_old.xlsx");
        let new = dir.path().join("detailed_report_new.xlsx");
        std::fs::write(&old, b"a").unwrap();
        std::fs::write(&new, b"b").unwrap();
        let earlier = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        let file = std::fs::File::options().write(true).open(&old).unwrap();
        file.set_modified(earlier).unwrap();

        let found = find_latest_report(dir.path(), "detailed_report").unwrap();
        assert_eq!(found, new);
    }

    #[test]
    fn missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_latest_report(dir.path(), "detailed_report"),
            Err(PipelineError::NoReport(_))
        ));
    }
}
