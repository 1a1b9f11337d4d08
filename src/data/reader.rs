//! Workbook Reader Module
//! Loads Excel workbooks into all-string Polars DataFrames using calamine.

use crate::config::AppConfig;
use calamine::{open_workbook_auto, Data, Range, Reader};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("failed to open workbook: {0}")]
    Open(#[from] calamine::Error),
    #[error("workbook has no usable sheets")]
    NoSheets,
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Office lock files (`~$report.xlsx`) left behind by an open Excel window.
fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("~$") || n.starts_with(".~"))
        .unwrap_or(false)
}

/// List the Excel workbooks in a directory, skipping temp files, sorted by name.
pub fn discover_workbooks(dir: &Path, cfg: &AppConfig) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Input folder not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && cfg.is_supported_file(p) && !is_temp_file(p))
        .collect();
    files.sort();

    info!(dir = %dir.display(), count = files.len(), "Workbooks discovered");
    files
}

/// Render a calamine cell as text. Floats that carry no fraction are printed
/// without a trailing `.0`; date cells become `YYYY-MM-DD[ HH:MM:SS]`.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{}", n))
            }
        }
        Data::Int(n) => Some(format!("{}", n)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(_) => None,
        Data::DateTime(dt) => dt.as_datetime().map(|ts| {
            if ts.time() == chrono::NaiveTime::MIN {
                ts.format("%Y-%m-%d").to_string()
            } else {
                ts.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Convert a sheet range into a DataFrame.
///
/// Row 0 is the header. Blank headers become `Unnamed: {idx}` so the cleaner
/// can strip those columns later, and duplicate headers get a `_2`, `_3`...
/// suffix. Fully empty rows are dropped here.
fn range_to_frame(range: &Range<Data>) -> PolarsResult<DataFrame> {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Ok(DataFrame::empty());
    }

    let mut rows = range.rows();
    let header = rows.next().unwrap_or(&[]);

    let mut used: HashSet<String> = HashSet::with_capacity(width);
    let mut names: Vec<String> = Vec::with_capacity(width);
    for (idx, cell) in header.iter().enumerate() {
        let base = cell_to_string(cell).unwrap_or_else(|| format!("Unnamed: {idx}"));
        // Suffix until the name is free, so "A, A_2, A" cannot collide
        let mut name = base.clone();
        let mut n = 1;
        while !used.insert(name.clone()) {
            n += 1;
            name = format!("{base}_{n}");
        }
        names.push(name);
    }

    let mut cols: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    for row in rows {
        let values: Vec<Option<String>> = row.iter().map(cell_to_string).collect();
        if values.iter().all(|v| v.is_none()) {
            continue;
        }
        for (idx, value) in values.into_iter().enumerate() {
            cols[idx].push(value);
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(cols)
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();

    DataFrame::new(columns)
}

/// Whether a sheet's header row contains any configured bug-marker column.
fn has_bug_markers(range: &Range<Data>, cfg: &AppConfig) -> bool {
    let Some(header) = range.rows().next() else {
        return false;
    };
    header
        .iter()
        .filter_map(cell_to_string)
        .any(|name| cfg.analysis.bug_marker_columns.iter().any(|m| m == &name))
}

/// Smart-read a workbook: pick the first sheet whose header row contains a
/// bug-marker column, otherwise fall back to the first non-empty sheet.
pub fn read_workbook(path: &Path, cfg: &AppConfig) -> Result<DataFrame, ReaderError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut fallback: Option<(String, Range<Data>)> = None;
    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                warn!(sheet = %name, error = %e, "Sheet not readable, skipping");
                continue;
            }
        };
        let (height, width) = range.get_size();
        if height == 0 || width == 0 {
            continue;
        }

        if has_bug_markers(&range, cfg) {
            info!(file = %path.display(), sheet = %name, rows = height, "Bug record sheet found");
            return Ok(range_to_frame(&range)?);
        }
        if fallback.is_none() {
            fallback = Some((name.clone(), range));
        }
    }

    match fallback {
        Some((name, range)) => {
            info!(file = %path.display(), sheet = %name, "No marker columns, using first non-empty sheet");
            Ok(range_to_frame(&range)?)
        }
        None => Err(ReaderError::NoSheets),
    }
}

/// Read a specific sheet, trying each candidate name in order and falling
/// back to the first sheet. Used when re-opening generated reports.
pub fn read_sheet(path: &Path, candidates: &[&str]) -> Result<DataFrame, ReaderError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for candidate in candidates {
        if sheet_names.iter().any(|n| n == candidate) {
            let range = workbook.worksheet_range(candidate)?;
            return Ok(range_to_frame(&range)?);
        }
    }

    let first = sheet_names.first().ok_or(ReaderError::NoSheets)?.clone();
    let range = workbook.worksheet_range(&first)?;
    Ok(range_to_frame(&range)?)
}
