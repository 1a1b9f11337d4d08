//! Validation Module
//! Structure and row-integrity checks for generated reports.

use crate::config::AppConfig;
use crate::data::{cell_text, read_sheet, ReaderError};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a report structure check.
#[derive(Debug)]
pub struct StructureReport {
    pub valid: bool,
    pub sheet_count: usize,
    pub sheet_names: Vec<String>,
    pub issues: Vec<String>,
}

/// Verify a generated report contains the expected sheets and that the
/// detailed sheet actually has data rows.
pub fn validate_report_structure(
    path: &Path,
    cfg: &AppConfig,
) -> Result<StructureReport, ReaderError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut issues = Vec::new();

    for expected in [&cfg.report.detailed_sheet, &cfg.report.stats_sheet] {
        if !sheet_names.iter().any(|n| n == expected) {
            issues.push(format!("missing sheet '{expected}'"));
        }
    }

    if sheet_names.iter().any(|n| n == &cfg.report.detailed_sheet) {
        let range = workbook.worksheet_range(&cfg.report.detailed_sheet)?;
        let (height, _) = range.get_size();
        if height <= 1 {
            issues.push(format!(
                "sheet '{}' has no data rows",
                cfg.report.detailed_sheet
            ));
        }
    }

    let valid = issues.is_empty();
    if valid {
        info!(path = %path.display(), sheets = sheet_names.len(), "Report structure is valid");
    } else {
        warn!(path = %path.display(), issues = ?issues, "Report structure check failed");
    }

    Ok(StructureReport {
        valid,
        sheet_count: sheet_names.len(),
        sheet_names,
        issues,
    })
}

/// Outcome of a row-integrity comparison between a source workbook and the
/// merged report it contributed to.
#[derive(Debug)]
pub struct IntegrityReport {
    pub original_rows: usize,
    pub merged_rows: usize,
    pub difference: i64,
}

/// Compare the row count of a source workbook with the rows of the merged
/// report whose source column contains `needle` (the source filename when
/// not given explicitly).
pub fn check_row_integrity(
    original: &Path,
    merged: &Path,
    needle: Option<&str>,
    cfg: &AppConfig,
) -> Result<IntegrityReport, ReaderError> {
    let original_df = crate::data::read_workbook(original, cfg)?;
    let merged_df = read_sheet(merged, &[cfg.report.detailed_sheet.as_str(), "Merged Data"])?;

    let fallback = original
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let needle = needle.unwrap_or(fallback);

    let original_rows = original_df.height();
    let source_col = merged_df
        .column(&cfg.report.source_column)
        .map(|c| c.clone())
        .ok();
    let mut merged_rows = 0;
    if let Some(column) = &source_col {
        for row in 0..merged_df.height() {
            if cell_text(&column.get(row)?)
                .map(|v| v.contains(needle))
                .unwrap_or(false)
            {
                merged_rows += 1;
            }
        }
    } else {
        warn!(column = %cfg.report.source_column, "Merged report has no source column");
    }
    let difference = merged_rows as i64 - original_rows as i64;

    if difference == 0 {
        info!(needle, rows = original_rows, "Row integrity holds");
    } else {
        warn!(
            needle,
            original_rows, merged_rows, "Row counts differ between source and merged report"
        );
    }

    Ok(IntegrityReport {
        original_rows,
        merged_rows,
        difference,
    })
}
