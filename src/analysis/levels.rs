//! Severity Level Analysis Module
//! Pivots merged bug records into a per-source-file severity breakdown.

use crate::analysis::{detect_columns, normalize_status, normalize_type, AnalysisError};
use crate::config::AppConfig;
use crate::data::column_values;
use crate::filename;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One pivot row: a `MMDD_tester` label with its per-severity counts.
#[derive(Debug, Clone)]
pub struct LevelRow {
    pub label: String,
    /// Parallel to `LevelAnalysis::level_columns`.
    pub by_level: Vec<u32>,
    pub total: u32,
    pub program: u32,
    pub program_fixed: u32,
    pub non_program: u32,
    pub non_program_fixed: u32,
}

impl LevelRow {
    fn empty(label: String, levels: usize) -> Self {
        Self {
            label,
            by_level: vec![0; levels],
            total: 0,
            program: 0,
            program_fixed: 0,
            non_program: 0,
            non_program_fixed: 0,
        }
    }
}

/// The severity pivot over all source files, plus grand totals.
#[derive(Debug, Clone)]
pub struct LevelAnalysis {
    /// Canonical severity labels in display order; the unrated label is
    /// appended only when unmapped values actually occurred.
    pub level_columns: Vec<String>,
    pub rows: Vec<LevelRow>,
    pub totals: LevelRow,
}

/// Normalize a raw severity value through the alias map. Canonical labels
/// pass through; everything else becomes the unrated label. Blanks were
/// already unrated upstream.
pub fn normalize_severity(raw: Option<&str>, cfg: &AppConfig) -> String {
    let analysis = &cfg.analysis;
    let Some(raw) = raw else {
        return analysis.unrated_label.clone();
    };
    let raw = raw.trim();
    if let Some(canonical) = analysis.severity_aliases.get(raw) {
        return canonical.clone();
    }
    if analysis.severity_order.iter().any(|l| l == raw) || raw == analysis.unrated_label {
        return raw.to_string();
    }
    analysis.unrated_label.clone()
}

impl LevelAnalysis {
    /// Build the pivot: label x severity counts plus program/non-program
    /// fix tallies per label. Rows with no source value are skipped.
    pub fn compute(df: &DataFrame, cfg: &AppConfig) -> Result<Self, AnalysisError> {
        let analysis = &cfg.analysis;
        let detected = detect_columns(df, analysis);
        let source_col = detected
            .source
            .ok_or(AnalysisError::MissingColumn("source"))?;
        let severity_col = detected
            .severity
            .ok_or(AnalysisError::MissingColumn("severity"))?;

        let sources = column_values(df, &source_col)?;
        let severities = column_values(df, &severity_col)?;
        let types = match &detected.bug_type {
            Some(name) => Some(column_values(df, name)?),
            None => None,
        };
        let statuses = match &detected.status {
            Some(name) => Some(column_values(df, name)?),
            None => None,
        };
        if types.is_none() || statuses.is_none() {
            warn!("Type or status column missing, fix tallies will be zero");
        }

        // label -> (severity -> count, type/status tallies)
        let mut per_label: BTreeMap<String, (BTreeMap<String, u32>, LevelRow)> = BTreeMap::new();
        let mut skipped = 0usize;
        let mut saw_unrated = false;

        for row in 0..df.height() {
            let Some(source) = sources[row].as_deref() else {
                skipped += 1;
                continue;
            };
            let label = filename::extract_label(source, analysis);
            let severity = normalize_severity(severities[row].as_deref(), cfg);
            if severity == analysis.unrated_label {
                saw_unrated = true;
            }

            let entry = per_label
                .entry(label.clone())
                .or_insert_with(|| (BTreeMap::new(), LevelRow::empty(label, 0)));
            *entry.0.entry(severity).or_insert(0) += 1;
            entry.1.total += 1;

            if let (Some(types), Some(statuses)) = (&types, &statuses) {
                let bug_type = normalize_type(types[row].as_deref(), analysis);
                let status = normalize_status(statuses[row].as_deref(), analysis);
                let fixed = status == analysis.fixed_label;
                if bug_type == analysis.program_label {
                    entry.1.program += 1;
                    if fixed {
                        entry.1.program_fixed += 1;
                    }
                } else {
                    entry.1.non_program += 1;
                    if fixed {
                        entry.1.non_program_fixed += 1;
                    }
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, "Rows without a source value were ignored");
        }

        let mut level_columns = analysis.severity_order.clone();
        if saw_unrated {
            level_columns.push(analysis.unrated_label.clone());
        }

        let mut rows = Vec::with_capacity(per_label.len());
        let mut totals = LevelRow::empty("Total".into(), level_columns.len());
        for (_label, (counts, tallies)) in per_label {
            let by_level: Vec<u32> = level_columns
                .iter()
                .map(|level| counts.get(level).copied().unwrap_or(0))
                .collect();
            for (i, n) in by_level.iter().enumerate() {
                totals.by_level[i] += n;
            }
            totals.total += tallies.total;
            totals.program += tallies.program;
            totals.program_fixed += tallies.program_fixed;
            totals.non_program += tallies.non_program;
            totals.non_program_fixed += tallies.non_program_fixed;

            rows.push(LevelRow { by_level, ..tallies });
        }

        info!(
            labels = rows.len(),
            total_bugs = totals.total,
            "Severity pivot computed"
        );

        Ok(Self {
            level_columns,
            rows,
            totals,
        })
    }

    /// Header row of the pivot sheet, in output order.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            "Source".to_string(),
            "Total".to_string(),
            "Program bugs".to_string(),
            "Program bugs fixed".to_string(),
            "Non-program bugs".to_string(),
            "Non-program bugs fixed".to_string(),
        ];
        headers.extend(self.level_columns.iter().cloned());
        headers
    }

    /// The pivot as a typed DataFrame (used by tests and the raw-data sheet).
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let labels: Vec<String> = self.rows.iter().map(|r| r.label.clone()).collect();
        let mut columns = vec![
            Column::new("Source".into(), labels),
            Column::new(
                "Total".into(),
                self.rows.iter().map(|r| r.total).collect::<Vec<u32>>(),
            ),
            Column::new(
                "Program bugs".into(),
                self.rows.iter().map(|r| r.program).collect::<Vec<u32>>(),
            ),
            Column::new(
                "Program bugs fixed".into(),
                self.rows
                    .iter()
                    .map(|r| r.program_fixed)
                    .collect::<Vec<u32>>(),
            ),
            Column::new(
                "Non-program bugs".into(),
                self.rows.iter().map(|r| r.non_program).collect::<Vec<u32>>(),
            ),
            Column::new(
                "Non-program bugs fixed".into(),
                self.rows
                    .iter()
                    .map(|r| r.non_program_fixed)
                    .collect::<Vec<u32>>(),
            ),
        ];
        for (i, level) in self.level_columns.iter().enumerate() {
            columns.push(Column::new(
                level.as_str().into(),
                self.rows.iter().map(|r| r.by_level[i]).collect::<Vec<u32>>(),
            ));
        }
        DataFrame::new(columns)
    }
}

/// Item/value rows for the summary sheet of the level report.
pub fn level_summary_frame(
    analysis: &LevelAnalysis,
    source_report: &str,
) -> PolarsResult<DataFrame> {
    let mut items: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();
    let mut push = |item: &str, value: String| {
        items.push(item.to_string());
        values.push(value);
    };

    push(
        "Analysis time",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    push("Source report", source_report.to_string());
    push("Files analyzed", analysis.rows.len().to_string());
    push("Total bugs", analysis.totals.total.to_string());

    for (i, level) in analysis.level_columns.iter().enumerate() {
        let count = analysis.totals.by_level[i];
        if count > 0 {
            push(&format!("{level} bugs"), count.to_string());
        }
    }

    let totals = &analysis.totals;
    push("Program bugs", totals.program.to_string());
    push("Program bugs fixed", totals.program_fixed.to_string());
    if totals.program > 0 {
        let rate = totals.program_fixed as f64 / totals.program as f64 * 100.0;
        push("Program fix rate", format!("{rate:.1}%"));
    }
    push("Non-program bugs", totals.non_program.to_string());
    push("Non-program bugs fixed", totals.non_program_fixed.to_string());
    if totals.non_program > 0 {
        let rate = totals.non_program_fixed as f64 / totals.non_program as f64 * 100.0;
        push("Non-program fix rate", format!("{rate:.1}%"));
    }

    DataFrame::new(vec![
        Column::new("Item".into(), items),
        Column::new("Value".into(), values),
    ])
}
