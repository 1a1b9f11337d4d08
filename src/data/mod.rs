//! Data module - workbook ingestion, cleaning and merging

pub mod cleaner;
pub mod merger;
pub mod reader;

pub use cleaner::clean;
pub use merger::merge_frames;
pub use reader::{discover_workbooks, read_sheet, read_workbook, ReaderError};

use polars::prelude::*;

/// Render a cell as trimmed text, treating nulls and blank strings as absent.
pub fn cell_text(value: &AnyValue) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let text = match value {
        AnyValue::String(s) => s.trim().to_string(),
        AnyValue::StringOwned(s) => s.as_str().trim().to_string(),
        other => other.to_string().trim_matches('"').trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Column names of a frame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// All values of a column rendered as optional text.
pub fn column_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        out.push(cell_text(&column.get(i)?));
    }
    Ok(out)
}
