//! Data Merger Module
//! Stacks per-tester frames into one table over the union of their columns.

use crate::data::column_names;
use polars::prelude::*;
use tracing::info;

/// Diagonal concatenation: the output schema is the union of all input
/// columns in first-seen order, missing cells are null. Input frames are
/// all-string, so no casting is involved.
pub fn merge_frames(frames: &[DataFrame]) -> PolarsResult<DataFrame> {
    let frames: Vec<&DataFrame> = frames
        .iter()
        .filter(|f| f.height() > 0 && f.width() > 0)
        .collect();
    if frames.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut order: Vec<String> = Vec::new();
    for frame in &frames {
        for name in column_names(frame) {
            if !order.contains(&name) {
                order.push(name);
            }
        }
    }

    let mut merged: Option<DataFrame> = None;
    for frame in &frames {
        let mut df = (*frame).clone();
        for name in &order {
            if df.column(name).is_err() {
                let filler =
                    Series::full_null(name.as_str().into(), df.height(), &DataType::String);
                df.with_column(filler)?;
            }
        }
        let aligned = df.select(order.iter().cloned())?;
        merged = Some(match merged {
            None => aligned,
            Some(acc) => acc.vstack(&aligned)?,
        });
    }

    let merged = merged.unwrap_or_else(DataFrame::empty);
    info!(
        frames = frames.len(),
        rows = merged.height(),
        columns = merged.width(),
        "Frames merged"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cols: &[(&str, Vec<&str>)]) -> DataFrame {
        let columns: Vec<Column> = cols
            .iter()
            .map(|(name, values)| {
                let owned: Vec<String> = values.iter().map(|s| s.to_string()).collect();
                Column::new((*name).into(), owned)
            })
            .collect();
        DataFrame::new(columns).expect("frame")
    }

    #[test]
    fn merge_takes_column_union_in_first_seen_order() {
        let a = frame(&[("ID", vec!["1", "2"]), ("Severity", vec!["S", "A"])]);
        let b = frame(&[("Severity", vec!["B"]), ("Notes", vec!["late"])]);

        let merged = merge_frames(&[a, b]).unwrap();
        assert_eq!(merged.height(), 3);
        assert_eq!(
            column_names(&merged),
            vec!["ID".to_string(), "Severity".to_string(), "Notes".to_string()]
        );

        // Rows from the second frame have no ID
        let ids = crate::data::column_values(&merged, "ID").unwrap();
        assert_eq!(ids, vec![Some("1".into()), Some("2".into()), None]);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let merged = merge_frames(&[]).unwrap();
        assert_eq!(merged.height(), 0);
    }

    #[test]
    fn empty_frames_are_ignored() {
        let a = frame(&[("ID", vec!["1"])]);
        let merged = merge_frames(&[DataFrame::empty(), a]).unwrap();
        assert_eq!(merged.height(), 1);
        assert_eq!(merged.width(), 1);
    }
}
