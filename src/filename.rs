//! Filename Extraction Module
//! Pulls report dates and tester names out of the source workbook filenames
//! that testers hand in (e.g. "bug记录0804_胡先美.xlsx").

use crate::config::AnalysisConfig;
use regex::Regex;
use std::sync::LazyLock;

static RECORD_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"记录(\d{4})").unwrap());
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").unwrap());
static DASH_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})-(\d{1,2})").unwrap());
static CN_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})月(\d{1,2})日?").unwrap());
static DOT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})(?:\.|$)").unwrap());

static UNDERSCORE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_([^_.]+)\.xlsx?$").unwrap());
static TRAILING_CJK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\p{Han}{2,4})\.xlsx?$").unwrap());
static HAS_CJK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Han}").unwrap());

/// Extract an `MMDD` date token from a filename.
///
/// Patterns are tried in order: digits after 记录/bug记录, the trailing four
/// digits of any digit run (so `20250804` yields `0804`), `MM/DD`, `MM-DD`,
/// `N月N日` and dotted `N.N`. Four-digit candidates starting with `20` are
/// rejected as year fragments.
pub fn extract_date(filename: &str) -> Option<String> {
    if let Some(caps) = RECORD_DATE.captures(filename) {
        let token = &caps[1];
        if !token.starts_with("20") {
            return Some(token.to_string());
        }
    }

    for run in DIGIT_RUN.find_iter(filename) {
        let token = run.as_str();
        if token.len() < 4 {
            continue;
        }
        let tail = &token[token.len() - 4..];
        if !tail.starts_with("20") {
            return Some(tail.to_string());
        }
    }

    for pattern in [&*SLASH_DATE, &*DASH_DATE, &*CN_DATE, &*DOT_DATE] {
        if let Some(caps) = pattern.captures(filename) {
            let month = format!("{:0>2}", &caps[1]);
            let day = format!("{:0>2}", &caps[2]);
            return Some(format!("{month}{day}"));
        }
    }

    None
}

/// Extract a tester name from a filename.
///
/// Known testers match anywhere; otherwise a short CJK token at the end of
/// the filename is accepted unless it is a generic word like 记录 or 报告.
/// Falls back to the configured default (the QA desk).
pub fn extract_tester(filename: &str, cfg: &AnalysisConfig) -> String {
    for name in &cfg.known_testers {
        if filename.contains(name.as_str()) {
            return name.clone();
        }
    }

    for pattern in [&*UNDERSCORE_NAME, &*TRAILING_CJK_NAME] {
        if let Some(caps) = pattern.captures(filename) {
            let candidate = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if HAS_CJK.is_match(candidate)
                && candidate.chars().count() <= 4
                && !cfg.tester_exclude_words.iter().any(|w| w == candidate)
            {
                return candidate.to_string();
            }
        }
    }

    cfg.fallback_tester.clone()
}

/// Combined `"{date}_{tester}"` label used as the per-file grouping key in
/// the severity pivot.
pub fn extract_label(filename: &str, cfg: &AnalysisConfig) -> String {
    let date = extract_date(filename).unwrap_or_else(|| cfg.fallback_date.clone());
    let tester = extract_tester(filename, cfg);
    format!("{date}_{tester}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    #[test]
    fn date_after_record_marker() {
        assert_eq!(extract_date("bug记录0804_胡先美.xlsx").as_deref(), Some("0804"));
        assert_eq!(extract_date("记录0715.xlsx").as_deref(), Some("0715"));
    }

    #[test]
    fn year_fragments_are_not_dates() {
        // "2025" after 记录 looks like a year, not MMDD
        assert_eq!(extract_date("测试记录2025.xlsx"), None);
        assert_eq!(extract_date("report_2024.xlsx"), None);
    }

    #[test]
    fn bare_four_digit_run() {
        assert_eq!(extract_date("0715-王超.xlsx").as_deref(), Some("0715"));
    }

    #[test]
    fn full_year_month_day_run_keeps_the_tail() {
        assert_eq!(
            extract_date("bug记录20250804.xlsx").as_deref(),
            Some("0804")
        );
        assert_eq!(extract_date("20251107_王超.xlsx").as_deref(), Some("1107"));
    }

    #[test]
    fn separated_date_forms() {
        assert_eq!(extract_date("07/15报告.xlsx").as_deref(), Some("0715"));
        assert_eq!(extract_date("07-15报告.xlsx").as_deref(), Some("0715"));
        assert_eq!(extract_date("8月5日记录.xlsx").as_deref(), Some("0805"));
        assert_eq!(extract_date("测试8.13.xlsx").as_deref(), Some("0813"));
    }

    #[test]
    fn no_date_present() {
        assert_eq!(extract_date("report.xlsx"), None);
    }

    #[test]
    fn known_tester_matches_anywhere() {
        let cfg = AnalysisConfig::default();
        assert_eq!(extract_tester("bug记录0804_胡先美.xlsx", &cfg), "胡先美");
    }

    #[test]
    fn underscore_suffix_name() {
        let cfg = AnalysisConfig::default();
        assert_eq!(extract_tester("0805_李雷.xlsx", &cfg), "李雷");
    }

    #[test]
    fn generic_words_fall_back_to_qa() {
        let cfg = AnalysisConfig::default();
        assert_eq!(extract_tester("0805_测试.xlsx", &cfg), cfg.fallback_tester);
        assert_eq!(extract_tester("report_v2.xlsx", &cfg), cfg.fallback_tester);
    }

    #[test]
    fn combined_label() {
        let cfg = AnalysisConfig::default();
        assert_eq!(extract_label("bug记录0804_胡先美.xlsx", &cfg), "0804_胡先美");
        assert_eq!(
            extract_label("notes.xlsx", &cfg),
            format!("{}_{}", cfg.fallback_date, cfg.fallback_tester)
        );
    }
}
