//! R `data.frame` → Arrow `RecordBatch`.
//!
//! Column mapping:
//! - logical                      → Boolean
//! - integer                      → Int32
//! - factor                       → Dictionary(Int32, Utf8)
//! - Date (integer or double)     → Date32
//! - POSIXct                      → Timestamp(µs, "UTC")
//! - integer64                    → Int64
//! - double                       → Float64
//! - character                    → Utf8
//! - anything else                → dropped with a warning

use super::error::{RDataError, Result};
use super::object::{RObject, RValue};
use arrow::{
    array::{
        ArrayRef, BooleanArray, Date32Array, DictionaryArray, Float64Array, Int32Array,
        Int64Array, StringArray, TimestampMicrosecondArray,
    },
    datatypes::{Field, Int32Type, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;
use tracing::warn;

const NA_REAL_PAYLOAD: u64 = 1954;
const NA_INTEGER64: i64 = i64::MIN;

pub fn is_data_frame(obj: &RObject) -> bool {
    matches!(obj.value, RValue::List(_)) && obj.inherits("data.frame")
}

pub fn data_frame_to_batch(name: &str, obj: &RObject) -> Result<RecordBatch> {
    let invalid = |reason: String| RDataError::InvalidFrame {
        name: name.to_string(),
        reason,
    };

    let RValue::List(columns) = &obj.value else {
        return Err(invalid("not a list".into()));
    };
    let names = obj
        .names()
        .ok_or_else(|| invalid("missing names attribute".into()))?;
    if names.len() != columns.len() {
        return Err(invalid(format!(
            "{} names for {} columns",
            names.len(),
            columns.len()
        )));
    }

    let nrows = row_count(obj, columns);
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());

    for (col_name, col) in names.iter().zip(columns) {
        let col_name = col_name.clone().unwrap_or_default();
        if col.len() != nrows {
            return Err(invalid(format!(
                "column {} has {} values, expected {}",
                col_name,
                col.len(),
                nrows
            )));
        }
        match column_to_array(col) {
            Some(array) => {
                fields.push(Field::new(&col_name, array.data_type().clone(), true));
                arrays.push(array);
            }
            None => {
                warn!(table = %name, column = %col_name, classes = ?col.classes(), "dropping column of unsupported type");
            }
        }
    }

    let options = RecordBatchOptions::new().with_row_count(Some(nrows));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
        .map_err(Into::into)
}

/// Compact `row.names` (`c(NA, -n)`) carries the count even for zero-column frames.
fn row_count(obj: &RObject, columns: &[RObject]) -> usize {
    if let Some(first) = columns.first() {
        return first.len();
    }
    match obj.attr("row.names").map(|r| &r.value) {
        Some(RValue::Integer(v)) if v.len() == 2 && v[0].is_none() => {
            v[1].map(|n| n.unsigned_abs() as usize).unwrap_or(0)
        }
        Some(_) => obj.attr("row.names").map(RObject::len).unwrap_or(0),
        None => 0,
    }
}

fn column_to_array(col: &RObject) -> Option<ArrayRef> {
    let array: ArrayRef = match &col.value {
        RValue::Logical(v) => Arc::new(BooleanArray::from(v.clone())),
        RValue::Integer(v) if col.inherits("factor") => factor_array(col, v)?,
        RValue::Integer(v) if col.inherits("Date") => Arc::new(Date32Array::from(v.clone())),
        RValue::Integer(v) => Arc::new(Int32Array::from(v.clone())),
        RValue::Real(v) if col.inherits("integer64") => Arc::new(Int64Array::from(
            v.iter()
                .map(|x| {
                    let bits = x.to_bits() as i64;
                    (bits != NA_INTEGER64).then_some(bits)
                })
                .collect::<Vec<_>>(),
        )),
        RValue::Real(v) if col.inherits("Date") => Arc::new(Date32Array::from(
            v.iter()
                .map(|x| x.is_finite().then(|| x.floor() as i32))
                .collect::<Vec<_>>(),
        )),
        RValue::Real(v) if col.inherits("POSIXct") => Arc::new(
            TimestampMicrosecondArray::from(
                v.iter()
                    .map(|x| x.is_finite().then(|| (x * 1_000_000.0).round() as i64))
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
        RValue::Real(v) => Arc::new(Float64Array::from(
            v.iter()
                .map(|x| (!is_na_real(*x)).then_some(*x))
                .collect::<Vec<_>>(),
        )),
        RValue::Character(v) => Arc::new(StringArray::from(v.clone())),
        _ => return None,
    };
    Some(array)
}

/// R codes are 1-based into `levels`; out-of-range codes become null.
fn factor_array(col: &RObject, codes: &[Option<i32>]) -> Option<ArrayRef> {
    let levels = match col.attr("levels").map(|l| &l.value) {
        Some(RValue::Character(v)) => v.clone(),
        _ => Vec::new(),
    };
    let nlevels = levels.len() as i32;
    let keys = Int32Array::from(
        codes
            .iter()
            .map(|c| c.filter(|&k| k >= 1 && k <= nlevels).map(|k| k - 1))
            .collect::<Vec<_>>(),
    );
    let values = Arc::new(StringArray::from(levels));
    DictionaryArray::<Int32Type>::try_new(keys, values)
        .ok()
        .map(|d| Arc::new(d) as ArrayRef)
}

/// `NA_real_` is a NaN whose low word is 1954; other NaNs are kept as values.
fn is_na_real(x: f64) -> bool {
    x.is_nan() && (x.to_bits() & 0xffff_ffff) == NA_REAL_PAYLOAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdata::parse::parse_rdata;
    use crate::rdata::testing::{na_real, XdrWriter};
    use arrow::{
        array::{Array, AsArray},
        datatypes::{DataType, Date32Type, TimeUnit, TimestampMicrosecondType},
    };

    /// transactions <- tibble(product_id, basket, ts, day, flag)
    fn sample_frame() -> Vec<u8> {
        let mut w = XdrWriter::rdx3();
        w.pairlist_node(true, false);
        w.symbol("transactions_sample");
        w.list_header(5, true);

        // product_id: character
        w.str_vector(&[Some("101"), Some("102"), None], false);
        // basket: factor(c("b", "a", "b"))
        w.int_vector(&[Some(2), Some(1), Some(2)], true);
        w.str_attr("levels", &["a", "b"]);
        w.str_attr("class", &["factor"]);
        w.nil();
        // ts: POSIXct
        w.real_vector(&[1_483_228_800.0, 1_483_315_200.5, na_real()], true);
        w.str_attr("class", &["POSIXct", "POSIXt"]);
        w.str_attr("tzone", &["UTC"]);
        w.nil();
        // day: Date (double)
        w.real_vector(&[17_167.0, 17_168.0, 17_169.0], true);
        w.str_attr("class", &["Date"]);
        w.nil();
        // flag: logical
        w.lgl_vector(&[Some(true), None, Some(false)], false);

        // frame attributes
        w.str_attr("names", &["product_id", "basket", "ts", "day", "flag"]);
        w.compact_row_names(3);
        w.str_attr("class", &["tbl_df", "tbl", "data.frame"]);
        w.nil();

        w.nil();
        w.finish_gzip()
    }

    #[test]
    fn converts_tibble_columns() {
        let objects = parse_rdata(&sample_frame()).unwrap();
        let (name, obj) = &objects[0];
        assert_eq!(name, "transactions_sample");
        assert!(is_data_frame(obj));

        let batch = data_frame_to_batch(name, obj).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 5);

        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert!(matches!(schema.field(1).data_type(), DataType::Dictionary(_, _)));
        assert_eq!(
            schema.field(2).data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(schema.field(3).data_type(), &DataType::Date32);
        assert_eq!(schema.field(4).data_type(), &DataType::Boolean);

        let ids = batch.column(0).as_string::<i32>();
        assert_eq!(ids.value(1), "102");
        assert!(ids.is_null(2));

        let basket = batch.column(1).as_dictionary::<Int32Type>();
        let levels = basket.values().as_string::<i32>();
        assert_eq!(levels.value(basket.keys().value(0) as usize), "b");
        assert_eq!(levels.value(basket.keys().value(1) as usize), "a");

        let ts = batch.column(2).as_primitive::<TimestampMicrosecondType>();
        assert_eq!(ts.value(0), 1_483_228_800_000_000);
        assert_eq!(ts.value(1), 1_483_315_200_500_000);
        assert!(ts.is_null(2));

        let day = batch.column(3).as_primitive::<Date32Type>();
        assert_eq!(day.value(0), 17_167);

        let flag = batch.column(4).as_boolean();
        assert!(flag.value(0));
        assert!(flag.is_null(1));
    }

    #[test]
    fn plain_nan_survives_but_na_is_null() {
        let col = RObject::new(RValue::Real(vec![f64::NAN, na_real(), 2.0]));
        let array = column_to_array(&col).unwrap();
        let floats = array.as_primitive::<arrow::datatypes::Float64Type>();
        assert!(floats.is_valid(0) && floats.value(0).is_nan());
        assert!(floats.is_null(1));
        assert_eq!(floats.value(2), 2.0);
    }

    #[test]
    fn zero_column_frame_uses_row_names() {
        let mut w = XdrWriter::rdx2();
        w.pairlist_node(true, false);
        w.symbol("empty");
        w.list_header(0, true);
        w.str_attr("names", &[]);
        w.compact_row_names(4);
        w.str_attr("class", &["data.frame"]);
        w.nil();
        w.nil();

        let objects = parse_rdata(&w.finish()).unwrap();
        let batch = data_frame_to_batch("empty", &objects[0].1).unwrap();
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.num_columns(), 0);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut w = XdrWriter::rdx2();
        w.pairlist_node(true, false);
        w.symbol("bad");
        w.list_header(2, true);
        w.int_vector(&[Some(1), Some(2)], false);
        w.int_vector(&[Some(1)], false);
        w.str_attr("names", &["a", "b"]);
        w.str_attr("class", &["data.frame"]);
        w.nil();
        w.nil();

        let objects = parse_rdata(&w.finish()).unwrap();
        let err = data_frame_to_batch("bad", &objects[0].1).unwrap_err();
        assert!(matches!(err, RDataError::InvalidFrame { .. }));
    }

    #[test]
    fn non_frames_are_not_frames() {
        let v = RObject::new(RValue::Integer(vec![Some(1)]));
        assert!(!is_data_frame(&v));
    }
}
