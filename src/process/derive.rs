// src/process/derive.rs

use super::temporal::{date_to_days, to_datetimes};
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Int64Array},
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use chrono::Datelike;
use std::sync::Arc;
use tracing::{debug, warn};

pub const TIMESTAMP_COLUMN: &str = "transaction_timestamp";
pub const DATE_COLUMN: &str = "transaction_date";
pub const WEEK_COLUMN: &str = "week";
pub const DAY_COLUMN: &str = "day";

/// Add `transaction_date`, `week` and `day` to the transactions table.
///
/// `transaction_date` is always recomputed from `transaction_timestamp`;
/// `week` and `day` are only filled in when the source lacks them.
pub fn derive_calendar_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let Ok(ts_idx) = schema.index_of(TIMESTAMP_COLUMN) else {
        warn!(column = TIMESTAMP_COLUMN, "transactions lack a timestamp; no calendar columns derived");
        return Ok(batch.clone());
    };

    let datetimes = to_datetimes(batch.column(ts_idx))
        .with_context(|| format!("interpreting {} as timestamps", TIMESTAMP_COLUMN))?;
    let dates: Vec<_> = datetimes.iter().map(|d| d.map(|d| d.date())).collect();

    let date_col = Date32Array::from(
        dates
            .iter()
            .map(|d| d.map(date_to_days))
            .collect::<Vec<_>>(),
    );
    let mut out = upsert_column(batch, DATE_COLUMN, Arc::new(date_col))?;

    if schema.index_of(WEEK_COLUMN).is_err() {
        let weeks = Int64Array::from(
            dates
                .iter()
                .map(|d| d.map(|d| d.iso_week().week() as i64))
                .collect::<Vec<_>>(),
        );
        out = upsert_column(&out, WEEK_COLUMN, Arc::new(weeks))?;
    } else {
        debug!("keeping source week column");
    }

    if schema.index_of(DAY_COLUMN).is_err() {
        let first = dates.iter().flatten().min().copied();
        let days = Int64Array::from(
            dates
                .iter()
                .map(|d| match (d, first) {
                    (Some(d), Some(first)) => Some((*d - first).num_days()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        );
        out = upsert_column(&out, DAY_COLUMN, Arc::new(days))?;
    } else {
        debug!("keeping source day column");
    }

    Ok(out)
}

/// Replace `name` in place if present, otherwise append it.
pub fn upsert_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let field = Arc::new(Field::new(name, array.data_type().clone(), true));

    let mut fields: Vec<_> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    match schema.index_of(name) {
        Ok(idx) => {
            fields[idx] = field;
            columns[idx] = array;
        }
        Err(_) => {
            fields.push(field);
            columns.push(array);
        }
    }

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    RecordBatch::try_new(schema, columns).with_context(|| format!("adding column {}", name))
}
