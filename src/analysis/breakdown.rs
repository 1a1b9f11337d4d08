//! Breakdown Analysis Module
//! Per-date and per-type aggregation with fix-rate percentages.

use crate::analysis::{
    detect_columns, normalize_status, normalize_type, rate_percent, AnalysisError,
};
use crate::config::AppConfig;
use crate::data::column_values;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Default, Clone)]
struct Tally {
    total: u32,
    program: u32,
    program_fixed: u32,
    non_program: u32,
    non_program_fixed: u32,
}

/// Group bug records by their date column.
///
/// Output columns: Date, Total, Program bugs, Program bugs fixed,
/// Non-program bugs, Non-program bugs fixed, and both fix rates as
/// percentages rounded to two decimals.
pub fn by_date(df: &DataFrame, cfg: &AppConfig) -> Result<DataFrame, AnalysisError> {
    let analysis = &cfg.analysis;
    let detected = detect_columns(df, analysis);
    let date_col = detected.date.ok_or(AnalysisError::MissingColumn("date"))?;

    let dates = column_values(df, &date_col)?;
    let types = match &detected.bug_type {
        Some(name) => Some(column_values(df, name)?),
        None => None,
    };
    let statuses = match &detected.status {
        Some(name) => Some(column_values(df, name)?),
        None => None,
    };

    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for row in 0..df.height() {
        let Some(date) = dates[row].clone() else {
            continue;
        };
        let tally = groups.entry(date).or_default();
        tally.total += 1;

        if let (Some(types), Some(statuses)) = (&types, &statuses) {
            let bug_type = normalize_type(types[row].as_deref(), analysis);
            let fixed = normalize_status(statuses[row].as_deref(), analysis) == analysis.fixed_label;
            if bug_type == analysis.program_label {
                tally.program += 1;
                if fixed {
                    tally.program_fixed += 1;
                }
            } else {
                tally.non_program += 1;
                if fixed {
                    tally.non_program_fixed += 1;
                }
            }
        }
    }

    info!(column = %date_col, dates = groups.len(), "Per-date breakdown computed");

    let keys: Vec<String> = groups.keys().cloned().collect();
    let tallies: Vec<Tally> = groups.values().cloned().collect();
    DataFrame::new(vec![
        Column::new("Date".into(), keys),
        Column::new(
            "Total".into(),
            tallies.iter().map(|t| t.total).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Program bugs".into(),
            tallies.iter().map(|t| t.program).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Program bugs fixed".into(),
            tallies.iter().map(|t| t.program_fixed).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Non-program bugs".into(),
            tallies.iter().map(|t| t.non_program).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Non-program bugs fixed".into(),
            tallies
                .iter()
                .map(|t| t.non_program_fixed)
                .collect::<Vec<u32>>(),
        ),
        Column::new(
            "Program fix rate (%)".into(),
            tallies
                .iter()
                .map(|t| rate_percent(t.program_fixed, t.program))
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            "Non-program fix rate (%)".into(),
            tallies
                .iter()
                .map(|t| rate_percent(t.non_program_fixed, t.non_program))
                .collect::<Vec<f64>>(),
        ),
    ])
    .map_err(AnalysisError::from)
}

/// Group bug records by their (canonicalized) type.
///
/// Output columns: Type, Total, Fixed, Fix rate (%). When no type column
/// exists every record counts as non-program, matching the ingest default.
pub fn by_type(df: &DataFrame, cfg: &AppConfig) -> Result<DataFrame, AnalysisError> {
    let analysis = &cfg.analysis;
    let detected = detect_columns(df, analysis);

    let types = match &detected.bug_type {
        Some(name) => Some(column_values(df, name)?),
        None => None,
    };
    let statuses = match &detected.status {
        Some(name) => Some(column_values(df, name)?),
        None => None,
    };

    let mut totals: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for row in 0..df.height() {
        let bug_type = match &types {
            Some(values) => normalize_type(values[row].as_deref(), analysis),
            None => analysis.non_program_label.clone(),
        };
        let fixed = statuses
            .as_ref()
            .map(|values| {
                normalize_status(values[row].as_deref(), analysis) == analysis.fixed_label
            })
            .unwrap_or(false);

        let entry = totals.entry(bug_type).or_insert((0, 0));
        entry.0 += 1;
        if fixed {
            entry.1 += 1;
        }
    }

    info!(types = totals.len(), "Per-type breakdown computed");

    let keys: Vec<String> = totals.keys().cloned().collect();
    let counts: Vec<(u32, u32)> = totals.values().copied().collect();
    DataFrame::new(vec![
        Column::new("Type".into(), keys),
        Column::new(
            "Total".into(),
            counts.iter().map(|(n, _)| *n).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Fixed".into(),
            counts.iter().map(|(_, f)| *f).collect::<Vec<u32>>(),
        ),
        Column::new(
            "Fix rate (%)".into(),
            counts
                .iter()
                .map(|(n, f)| rate_percent(*f, *n))
                .collect::<Vec<f64>>(),
        ),
    ])
    .map_err(AnalysisError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn sample_frame(cfg: &AppConfig) -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "Date".into(),
                vec!["0804", "0804", "0804", "0805"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                cfg.analysis.type_column.as_str().into(),
                vec!["Program bug", "Program bug", "Non-program bug", "Program bug"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                cfg.analysis.status_column.as_str().into(),
                vec!["Fixed", "Unfixed", "Fixed", "Unfixed"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn by_date_counts_and_rates() {
        let cfg = AppConfig::default();
        let out = by_date(&sample_frame(&cfg), &cfg).unwrap();
        assert_eq!(out.height(), 2);

        // 0804: 2 program (1 fixed), 1 non-program (1 fixed)
        let totals = crate::data::column_values(&out, "Total").unwrap();
        assert_eq!(totals[0].as_deref(), Some("3"));

        let rates = out.column("Program fix rate (%)").unwrap().f64().unwrap();
        assert_eq!(rates.get(0), Some(50.0));
        // 0805 has no non-program bugs: zero denominator yields 0
        let non_rates = out
            .column("Non-program fix rate (%)")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(non_rates.get(1), Some(0.0));
    }

    #[test]
    fn by_date_requires_a_date_column() {
        let cfg = AppConfig::default();
        let df = DataFrame::new(vec![Column::new("A".into(), vec!["1".to_string()])]).unwrap();
        assert!(matches!(
            by_date(&df, &cfg),
            Err(AnalysisError::MissingColumn("date"))
        ));
    }

    #[test]
    fn by_type_defaults_to_non_program_without_a_type_column() {
        let cfg = AppConfig::default();
        let df = DataFrame::new(vec![Column::new(
            "Bug ID".into(),
            vec!["1".to_string(), "2".to_string()],
        )])
        .unwrap();
        let out = by_type(&df, &cfg).unwrap();
        assert_eq!(out.height(), 1);
        let types = crate::data::column_values(&out, "Type").unwrap();
        assert_eq!(types[0].as_deref(), Some(cfg.analysis.non_program_label.as_str()));
    }

    #[test]
    fn by_type_counts_fixed() {
        let cfg = AppConfig::default();
        let out = by_type(&sample_frame(&cfg), &cfg).unwrap();
        assert_eq!(out.height(), 2);
        // BTreeMap order: "Non-program bug" < "Program bug"
        let fixed = crate::data::column_values(&out, "Fixed").unwrap();
        assert_eq!(fixed[0].as_deref(), Some("1"));
        assert_eq!(fixed[1].as_deref(), Some("1"));
    }
}
