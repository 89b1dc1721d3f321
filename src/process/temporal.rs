// src/process/temporal.rs

use arrow::{
    array::{ArrayRef, AsArray},
    compute::{cast, cast_with_options, CastOptions},
    datatypes::{DataType, TimeUnit, TimestampMicrosecondType},
    error::Result as ArrowResult,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Days from 0001-01-01 (CE) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// True for the column types counted as dates in table metadata.
pub fn is_date_like(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

/// Cast a temporal, string or numeric column to naive UTC datetimes.
/// Bare numbers count nanoseconds since the epoch.
/// Values that do not parse become `None`; unsupported source types are an error.
pub fn to_datetimes(array: &ArrayRef) -> ArrowResult<Vec<Option<NaiveDateTime>>> {
    let unpacked = match array.data_type() {
        DataType::Dictionary(_, value) => cast(array, value)?,
        _ => array.clone(),
    };
    let unpacked = if unpacked.data_type().is_numeric() {
        let nanos = cast(&unpacked, &DataType::Int64)?;
        cast(&nanos, &DataType::Timestamp(TimeUnit::Nanosecond, None))?
    } else {
        unpacked
    };
    let options = CastOptions {
        safe: true,
        ..Default::default()
    };
    let ts = cast_with_options(
        &unpacked,
        &DataType::Timestamp(TimeUnit::Microsecond, None),
        &options,
    )?;
    let ts = ts.as_primitive::<TimestampMicrosecondType>();

    Ok(ts
        .iter()
        .map(|v| v.and_then(DateTime::from_timestamp_micros).map(|d| d.naive_utc()))
        .collect())
}

pub fn to_dates(array: &ArrayRef) -> ArrowResult<Vec<Option<NaiveDate>>> {
    Ok(to_datetimes(array)?
        .into_iter()
        .map(|d| d.map(|d| d.date()))
        .collect())
}

/// `Date32` storage value for a calendar date.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Smallest and largest non-null date, if any.
pub fn date_bounds<'a, I>(dates: I) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = &'a Option<NaiveDate>>,
{
    dates.into_iter().flatten().fold(None, |acc, &d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

/// Number of values that parsed.
pub fn parsed_count<T>(values: &[Option<T>]) -> usize {
    values.iter().filter(|v| v.is_some()).count()
}
