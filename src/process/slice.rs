// src/process/slice.rs

use super::derive::WEEK_COLUMN;
use crate::config::SliceOptions;
use anyhow::{Context, Result};
use arrow::{
    array::{AsArray, BooleanArray},
    compute::{cast, filter_record_batch},
    datatypes::{DataType, Int64Type},
    record_batch::RecordBatch,
};
use tracing::{info, warn};

/// Row limit first, then the week window.
pub fn apply_slicing(batch: &RecordBatch, options: &SliceOptions) -> Result<RecordBatch> {
    let mut out = batch.clone();
    if let Some(n) = options.rows {
        out = slice_rows(&out, n);
        info!(limit = n, rows = out.num_rows(), "sliced transactions by rows");
    }
    if let Some(n) = options.weeks {
        out = slice_weeks(&out, n)?;
        info!(weeks = n, rows = out.num_rows(), "sliced transactions by weeks");
    }
    Ok(out)
}

/// Keep the first `n` rows.
pub fn slice_rows(batch: &RecordBatch, n: usize) -> RecordBatch {
    batch.slice(0, n.min(batch.num_rows()))
}

/// Keep rows with `week >= max(week) - n`. Rows with a null week are dropped.
pub fn slice_weeks(batch: &RecordBatch, n: u32) -> Result<RecordBatch> {
    let Some(week) = batch.column_by_name(WEEK_COLUMN) else {
        warn!("no week column; week slicing skipped");
        return Ok(batch.clone());
    };
    let week = cast(week, &DataType::Int64).context("casting week to Int64")?;
    let week = week.as_primitive::<Int64Type>();

    let mask: BooleanArray = match week.iter().flatten().max() {
        Some(max) => {
            let threshold = max - i64::from(n);
            week.iter()
                .map(|w| Some(w.is_some_and(|w| w >= threshold)))
                .collect()
        }
        None => BooleanArray::from(vec![false; batch.num_rows()]),
    };
    filter_record_batch(batch, &mask).context("filtering transactions by week")
}
