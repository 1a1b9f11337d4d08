//! Summary Statistics Module
//! Item/value rows describing a merged dataset: shape, data quality,
//! provenance and categorical tallies.

use crate::analysis::detect_columns;
use crate::config::AppConfig;
use crate::data::{cell_text, column_names, column_values};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Count of rows whose rendered cells exactly repeat an earlier row.
pub fn duplicate_row_count(df: &DataFrame) -> PolarsResult<usize> {
    let mut seen: HashSet<String> = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    let columns = df.get_columns();
    for row in 0..df.height() {
        let mut key = String::new();
        for column in columns {
            key.push_str(cell_text(&column.get(row)?).as_deref().unwrap_or(""));
            key.push('\u{1}');
        }
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}

/// Per-column missing-value counts, only for columns that have any.
pub fn missing_counts(df: &DataFrame) -> PolarsResult<Vec<(String, usize)>> {
    let mut out = Vec::new();
    for column in df.get_columns() {
        let mut missing = 0;
        for row in 0..df.height() {
            if cell_text(&column.get(row)?).is_none() {
                missing += 1;
            }
        }
        if missing > 0 {
            out.push((column.name().to_string(), missing));
        }
    }
    Ok(out)
}

/// Distinct value tallies for one column, blanks excluded.
pub fn value_counts(df: &DataFrame, column: &str) -> PolarsResult<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for value in column_values(df, column)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    Ok(counts)
}

fn item_value_frame(rows: Vec<(String, String)>) -> PolarsResult<DataFrame> {
    let (items, values): (Vec<String>, Vec<String>) = rows.into_iter().unzip();
    DataFrame::new(vec![
        Column::new("Item".into(), items),
        Column::new("Value".into(), values),
    ])
}

/// Analysis statistics for the unified report's second sheet.
pub fn dataset_summary(
    df: &DataFrame,
    source_info: Option<&str>,
    original_shape: Option<(usize, usize)>,
    cfg: &AppConfig,
) -> PolarsResult<DataFrame> {
    let mut rows: Vec<(String, String)> = Vec::new();
    let mut push = |item: &str, value: String| rows.push((item.to_string(), value));

    if let Some(source) = source_info {
        push("Data source", source.to_string());
    }
    push(
        "Analysis time",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    if let Some((orig_rows, orig_cols)) = original_shape {
        push("Original rows", orig_rows.to_string());
        push("Original columns", orig_cols.to_string());
    }
    push("Rows", df.height().to_string());
    push("Columns", df.width().to_string());

    if df.height() > 0 {
        let total_cells = df.height() * df.width();
        let missing = missing_counts(df)?;
        let empty_cells: usize = missing.iter().map(|(_, n)| n).sum();
        push("Empty cells", empty_cells.to_string());
        if total_cells > 0 {
            let complete = (total_cells - empty_cells) as f64 / total_cells as f64 * 100.0;
            push("Data completeness", format!("{complete:.1}%"));
        }
        push("Duplicate rows", duplicate_row_count(df)?.to_string());

        if missing.is_empty() {
            push("Missing values", "none".to_string());
        } else {
            let detail: Vec<String> = missing
                .iter()
                .map(|(name, n)| {
                    let pct = *n as f64 / df.height() as f64 * 100.0;
                    format!("{name}: {n} ({pct:.1}%)")
                })
                .collect();
            push("Missing values", detail.join("; "));
        }

        let source_col = &cfg.report.source_column;
        if column_names(df).contains(source_col) {
            let sources = value_counts(df, source_col)?;
            push("Source files", sources.len().to_string());
            let listed: Vec<String> = sources.keys().take(5).cloned().collect();
            push("Source file list", listed.join("; "));
        }

        // Categorical tallies for the detected business columns
        let detected = detect_columns(df, &cfg.analysis);
        for column in [&detected.severity, &detected.status, &detected.bug_type]
            .into_iter()
            .flatten()
        {
            for (value, count) in value_counts(df, column)? {
                push(&format!("{value} count"), count.to_string());
            }
        }
    } else {
        push("Data state", "empty after cleaning".to_string());
    }

    item_value_frame(rows)
}

/// Batch-run statistics: file provenance and data quality of the merged frame.
pub fn batch_statistics(
    df: &DataFrame,
    processed_files: &[String],
    cfg: &AppConfig,
) -> PolarsResult<DataFrame> {
    let mut rows: Vec<(String, String)> = Vec::new();
    let mut push = |item: &str, value: String| rows.push((item.to_string(), value));

    push(
        "Processed at",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    push("Files processed", processed_files.len().to_string());
    push("Rows", df.height().to_string());
    push("Columns", df.width().to_string());

    let source_col = &cfg.report.source_column;
    if column_names(df).contains(source_col) {
        for (source, count) in value_counts(df, source_col)? {
            push(&format!("  {source}"), count.to_string());
        }
    }

    let missing = missing_counts(df)?;
    let total_missing: usize = missing.iter().map(|(_, n)| n).sum();
    push("Missing cells", total_missing.to_string());
    for (name, count) in &missing {
        let pct = *count as f64 / df.height().max(1) as f64 * 100.0;
        push(&format!("  {name}"), format!("{count} ({pct:.1}%)"));
    }
    push("Duplicate rows", duplicate_row_count(df)?.to_string());

    item_value_frame(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn sample_frame(cfg: &AppConfig) -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "Bug ID".into(),
                vec![Some("1".to_string()), Some("2".into()), Some("2".into()), None],
            ),
            Column::new(
                cfg.report.source_column.as_str().into(),
                vec![
                    Some("a.xlsx".to_string()),
                    Some("b.xlsx".into()),
                    Some("b.xlsx".into()),
                    Some("b.xlsx".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn duplicates_and_missing_are_counted() {
        let cfg = AppConfig::default();
        let df = sample_frame(&cfg);
        // Rows 1 and 2 are identical
        assert_eq!(duplicate_row_count(&df).unwrap(), 1);
        let missing = missing_counts(&df).unwrap();
        assert_eq!(missing, vec![("Bug ID".to_string(), 1)]);
    }

    #[test]
    fn summary_lists_sources_and_shape() {
        let cfg = AppConfig::default();
        let df = sample_frame(&cfg);
        let summary = dataset_summary(&df, Some("batch"), Some((5, 2)), &cfg).unwrap();

        let items = crate::data::column_values(&summary, "Item").unwrap();
        let values = crate::data::column_values(&summary, "Value").unwrap();
        let find = |item: &str| {
            items
                .iter()
                .position(|i| i.as_deref() == Some(item))
                .map(|idx| values[idx].clone().unwrap())
        };

        assert_eq!(find("Rows").as_deref(), Some("4"));
        assert_eq!(find("Original rows").as_deref(), Some("5"));
        assert_eq!(find("Source files").as_deref(), Some("2"));
        assert_eq!(find("Duplicate rows").as_deref(), Some("1"));
    }

    #[test]
    fn batch_statistics_tally_per_source() {
        let cfg = AppConfig::default();
        let df = sample_frame(&cfg);
        let stats =
            batch_statistics(&df, &["a.xlsx".to_string(), "b.xlsx".to_string()], &cfg).unwrap();
        let items = crate::data::column_values(&stats, "Item").unwrap();
        assert!(items.iter().any(|i| i.as_deref() == Some("b.xlsx")));
    }
}
