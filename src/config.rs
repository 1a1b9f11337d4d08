//! Configuration Module
//! Typed defaults for cleaning, report and analysis behavior, optionally
//! overridden from a JSON file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where generated reports are written.
    pub output_dir: PathBuf,
    /// Workbook extensions accepted as input.
    pub supported_extensions: Vec<String>,
    pub cleaning: CleaningConfig,
    pub report: ReportConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub remove_unnamed_columns: bool,
    /// Column name fragments that mark a column as a spreadsheet artifact.
    pub unnamed_column_patterns: Vec<String>,
    pub remove_empty_rows: bool,
    pub remove_empty_columns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub include_source_column: bool,
    pub include_timestamp: bool,
    /// Header of the provenance column appended to every ingested row.
    pub source_column: String,
    pub timestamp_column: String,
    /// Sheet names used by the unified detailed report.
    pub detailed_sheet: String,
    pub stats_sheet: String,
    /// Filename prefix used when discovering the latest detailed report.
    pub report_prefix: String,
}

/// Column detection keywords and categorical vocabularies.
///
/// The defaults carry both English and Chinese variants because the bug
/// report spreadsheets this tool was built for use Chinese headers and
/// labels (严重级别, 程序Bug, ...). Canonical output labels are English.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Header names that identify a sheet as holding bug records.
    pub bug_marker_columns: Vec<String>,
    pub severity_keywords: Vec<String>,
    pub source_keywords: Vec<String>,
    pub type_keywords: Vec<String>,
    pub status_keywords: Vec<String>,
    pub date_keywords: Vec<String>,
    /// Raw severity value -> canonical severity label.
    pub severity_aliases: HashMap<String, String>,
    /// Canonical severity labels in display order.
    pub severity_order: Vec<String>,
    pub unrated_label: String,
    /// Name and canonical values of the inferred bug-type column.
    pub type_column: String,
    pub program_label: String,
    pub non_program_label: String,
    pub type_aliases: HashMap<String, String>,
    /// Name and canonical values of the inferred fix-status column.
    pub status_column: String,
    pub fixed_label: String,
    pub unfixed_label: String,
    pub status_aliases: HashMap<String, String>,
    /// Tester names matched verbatim in source filenames.
    pub known_testers: Vec<String>,
    /// Filename fragments that must never be mistaken for a tester name.
    pub tester_exclude_words: Vec<String>,
    pub fallback_date: String,
    pub fallback_tester: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            supported_extensions: vec!["xlsx".into(), "xls".into()],
            cleaning: CleaningConfig::default(),
            report: ReportConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_unnamed_columns: true,
            unnamed_column_patterns: vec!["Unnamed:".into(), "unnamed:".into()],
            remove_empty_rows: true,
            remove_empty_columns: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_source_column: true,
            include_timestamp: true,
            source_column: "Source File".into(),
            timestamp_column: "Processed At".into(),
            detailed_sheet: "Detailed Data".into(),
            stats_sheet: "Analysis Stats".into(),
            report_prefix: "detailed_report".into(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let severity_aliases: HashMap<String, String> = [
            ("S-严重", "S"),
            ("A-重要", "A"),
            ("B-一般", "B"),
            ("C-轻微", "C"),
            ("S级", "S"),
            ("A级", "A"),
            ("B级", "B"),
            ("C级", "C"),
            ("S-Critical", "S"),
            ("A-Major", "A"),
            ("B-Normal", "B"),
            ("C-Minor", "C"),
            ("未分级", "Unrated"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let type_aliases: HashMap<String, String> = [
            ("程序Bug", "Program bug"),
            ("程序bug", "Program bug"),
            ("非程序Bug", "Non-program bug"),
            ("非程序bug", "Non-program bug"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let status_aliases: HashMap<String, String> = [
            ("已修复", "Fixed"),
            ("已解决", "Fixed"),
            ("未修复", "Unfixed"),
            ("fixed", "Fixed"),
            ("resolved", "Fixed"),
            ("open", "Unfixed"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            bug_marker_columns: vec![
                "编号".into(),
                "严重级别".into(),
                "级别".into(),
                "bug类型".into(),
                "问题描述".into(),
                "Bug ID".into(),
                "Severity".into(),
                "Description".into(),
            ],
            severity_keywords: vec![
                "severity".into(),
                "级别".into(),
                "level".into(),
                "等级".into(),
                "priority".into(),
                "严重".into(),
            ],
            source_keywords: vec![
                "source".into(),
                "来源".into(),
                "文件".into(),
                "file".into(),
            ],
            type_keywords: vec![
                "type".into(),
                "类型".into(),
                "种类".into(),
                "category".into(),
            ],
            status_keywords: vec![
                "status".into(),
                "状态".into(),
                "修复".into(),
                "fixed".into(),
                "resolved".into(),
            ],
            date_keywords: vec!["date".into(), "日期".into(), "时间".into()],
            severity_aliases,
            severity_order: vec!["S".into(), "A".into(), "B".into(), "C".into()],
            unrated_label: "Unrated".into(),
            type_column: "Bug Type".into(),
            program_label: "Program bug".into(),
            non_program_label: "Non-program bug".into(),
            type_aliases,
            status_column: "Fix Status".into(),
            fixed_label: "Fixed".into(),
            unfixed_label: "Unfixed".into(),
            status_aliases,
            known_testers: vec!["胡先美".into(), "王超".into(), "李明".into()],
            tester_exclude_words: vec![
                "记录".into(),
                "报告".into(),
                "测试".into(),
                "分析".into(),
                "统计".into(),
                "汇总".into(),
            ],
            fallback_date: "unknown".into(),
            fallback_tester: "QA".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Whether the file extension is an accepted workbook format.
    pub fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.supported_extensions.iter().any(|s| s == &ext)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_accept_excel_extensions_only() {
        let cfg = AppConfig::default();
        assert!(cfg.is_supported_file(Path::new("a.xlsx")));
        assert!(cfg.is_supported_file(Path::new("b.XLS")));
        assert!(!cfg.is_supported_file(Path::new("c.csv")));
        assert!(!cfg.is_supported_file(Path::new("noext")));
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"output_dir": "reports"}"#).expect("parse");
        assert_eq!(parsed.output_dir, PathBuf::from("reports"));
        assert!(parsed.cleaning.remove_unnamed_columns);
        assert_eq!(parsed.analysis.severity_order.len(), 4);
    }
}
