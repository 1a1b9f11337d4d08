//! Report Writer Module
//! Renders DataFrames into multi-sheet xlsx workbooks.

use crate::analysis::LevelAnalysis;
use polars::prelude::*;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use tracing::info;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("xlsx write failed: {0}")]
    Xlsx(#[from] XlsxError),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

fn header_format() -> Format {
    Format::new().set_bold()
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &AnyValue,
) -> Result<(), XlsxError> {
    match value {
        AnyValue::Null => Ok(()),
        AnyValue::String(s) => ws.write(row, col, *s).map(|_| ()),
        AnyValue::StringOwned(s) => ws.write(row, col, s.as_str()).map(|_| ()),
        AnyValue::Boolean(b) => ws.write(row, col, *b).map(|_| ()),
        AnyValue::UInt32(n) => ws.write(row, col, *n as f64).map(|_| ()),
        AnyValue::UInt64(n) => ws.write(row, col, *n as f64).map(|_| ()),
        AnyValue::Int32(n) => ws.write(row, col, *n as f64).map(|_| ()),
        AnyValue::Int64(n) => ws.write(row, col, *n as f64).map(|_| ()),
        AnyValue::Float32(n) => ws.write(row, col, *n as f64).map(|_| ()),
        AnyValue::Float64(n) => ws.write(row, col, *n).map(|_| ()),
        other => {
            let text = other.to_string();
            ws.write(row, col, text.trim_matches('"')).map(|_| ())
        }
    }
}

fn write_frame(ws: &mut Worksheet, df: &DataFrame) -> Result<(), ReportError> {
    let bold = header_format();
    if df.width() == 0 {
        ws.write_with_format(0, 0, "No data", &bold)?;
        return Ok(());
    }

    for (col, column) in df.get_columns().iter().enumerate() {
        ws.write_with_format(0, col as u16, column.name().as_str(), &bold)?;
    }
    for (col, column) in df.get_columns().iter().enumerate() {
        for row in 0..df.height() {
            write_cell(ws, row as u32 + 1, col as u16, &column.get(row)?)?;
        }
    }

    // Readable defaults without measuring content
    for col in 0..df.width() {
        ws.set_column_width(col as u16, 18)?;
    }
    Ok(())
}

/// Write one workbook with the given (sheet name, frame) pairs.
pub fn write_sheets(path: &Path, sheets: &[(String, &DataFrame)]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    for (name, df) in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(name.as_str())?;
        write_frame(ws, df)?;
    }
    workbook.save(path)?;
    info!(path = %path.display(), sheets = sheets.len(), "Workbook written");
    Ok(())
}

/// Write the severity-level report: the pivot sheet with a highlighted
/// totals row, plus an item/value summary sheet.
pub fn write_level_report(
    path: &Path,
    analysis: &LevelAnalysis,
    summary: &DataFrame,
) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let bold = header_format();
    let totals_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x00D3_D3D3));

    let ws = workbook.add_worksheet();
    ws.set_name("Level Analysis")?;

    for (col, header) in analysis.headers().iter().enumerate() {
        ws.write_with_format(0, col as u16, header.as_str(), &bold)?;
    }

    let mut row = 1u32;
    for level_row in &analysis.rows {
        ws.write(row, 0, level_row.label.as_str())?;
        ws.write(row, 1, level_row.total as f64)?;
        ws.write(row, 2, level_row.program as f64)?;
        ws.write(row, 3, level_row.program_fixed as f64)?;
        ws.write(row, 4, level_row.non_program as f64)?;
        ws.write(row, 5, level_row.non_program_fixed as f64)?;
        for (i, count) in level_row.by_level.iter().enumerate() {
            ws.write(row, 6 + i as u16, *count as f64)?;
        }
        row += 1;
    }

    // Grand totals only make sense with more than one source file
    if analysis.rows.len() > 1 {
        let totals = &analysis.totals;
        ws.write_with_format(row, 0, totals.label.as_str(), &totals_format)?;
        ws.write_with_format(row, 1, totals.total as f64, &totals_format)?;
        ws.write_with_format(row, 2, totals.program as f64, &totals_format)?;
        ws.write_with_format(row, 3, totals.program_fixed as f64, &totals_format)?;
        ws.write_with_format(row, 4, totals.non_program as f64, &totals_format)?;
        ws.write_with_format(row, 5, totals.non_program_fixed as f64, &totals_format)?;
        for (i, count) in totals.by_level.iter().enumerate() {
            ws.write_with_format(row, 6 + i as u16, *count as f64, &totals_format)?;
        }
    }

    ws.set_column_width(0, 25)?;
    ws.set_column_width(1, 10)?;
    ws.set_column_width(2, 12)?;
    ws.set_column_width(3, 15)?;
    ws.set_column_width(4, 15)?;
    ws.set_column_width(5, 18)?;
    for i in 0..analysis.level_columns.len() {
        ws.set_column_width(6 + i as u16, 8)?;
    }

    let summary_ws = workbook.add_worksheet();
    summary_ws.set_name("Summary")?;
    write_frame(summary_ws, summary)?;
    summary_ws.set_column_width(0, 20)?;
    summary_ws.set_column_width(1, 25)?;

    workbook.save(path)?;
    info!(path = %path.display(), "Level report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_sheet;

    fn text_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "编号".into(),
                vec![Some("1".to_string()), Some("0804".into()), None],
            ),
            Column::new(
                "问题描述".into(),
                vec![
                    Some("闪退".to_string()),
                    Some("文字重叠".into()),
                    Some("其他".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn written_workbook_reads_back_with_strings_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let df = text_frame();
        write_sheets(&path, &[("Merged Data".to_string(), &df)]).unwrap();

        let back = read_sheet(&path, &["Merged Data"]).unwrap();
        assert_eq!(back.height(), 3);
        // Leading zeros survive because string cells stay strings
        let ids = crate::data::column_values(&back, "编号").unwrap();
        assert_eq!(ids[1].as_deref(), Some("0804"));
    }

    #[test]
    fn empty_frame_gets_a_placeholder_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_sheets(&path, &[("Detailed Data".to_string(), &DataFrame::empty())]).unwrap();
        assert!(path.exists());
    }
}
