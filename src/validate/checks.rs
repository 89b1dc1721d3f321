// src/validate/checks.rs

use crate::process::temporal::{date_bounds, parsed_count, to_dates};
use arrow::{
    array::{ArrayRef, AsArray},
    compute::cast,
    datatypes::{DataType, Float64Type},
    error::Result as ArrowResult,
    record_batch::RecordBatch,
};
use std::collections::HashSet;

/// Key values rendered as strings so integer, string and dictionary keys compare alike.
/// Nulls are kept as `None`.
pub fn string_keys(array: &ArrayRef) -> ArrowResult<Vec<Option<String>>> {
    let rendered = cast(array, &DataType::Utf8)?;
    Ok(rendered
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

pub fn has_duplicates(keys: &[Option<String>]) -> bool {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().any(|k| !seen.insert(k))
}

/// True when some value of `child` does not appear in `parent`.
pub fn has_dangling(child: &[Option<String>], parent: &[Option<String>]) -> bool {
    let parent: HashSet<_> = parent.iter().collect();
    child.iter().any(|k| !parent.contains(k))
}

pub fn has_negative(array: &ArrayRef) -> ArrowResult<bool> {
    let values = cast(array, &DataType::Float64)?;
    Ok(values
        .as_primitive::<Float64Type>()
        .iter()
        .flatten()
        .any(|v| v < 0.0))
}

/// Outcome of reading a date-like column.
#[derive(Debug, PartialEq, Eq)]
pub enum DateColumn {
    Valid,
    Unparseable,
    InvalidRange,
}

pub fn check_date_column(array: &ArrayRef) -> DateColumn {
    let dates = match to_dates(array) {
        Ok(d) => d,
        Err(_) => return DateColumn::Unparseable,
    };
    if parsed_count(&dates) == 0 {
        return DateColumn::Unparseable;
    }
    match date_bounds(&dates) {
        Some((lo, hi)) if lo <= hi => DateColumn::Valid,
        _ => DateColumn::InvalidRange,
    }
}

/// Names of columns that hold dates or timestamps by naming convention.
pub fn date_columns(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .filter(|name| name.contains("date") || name.contains("timestamp"))
        .collect()
}

/// `(coupon_upc, campaign_id)` pairs, or `None` if either column is absent.
pub fn pair_keys(batch: &RecordBatch, a: &str, b: &str) -> ArrowResult<Option<Vec<(Option<String>, Option<String>)>>> {
    let (Some(left), Some(right)) = (batch.column_by_name(a), batch.column_by_name(b)) else {
        return Ok(None);
    };
    let left = string_keys(left)?;
    let right = string_keys(right)?;
    Ok(Some(left.into_iter().zip(right).collect()))
}
