// src/metadata.rs

use crate::process::temporal::{date_bounds, is_date_like, to_dates};
use anyhow::{Context, Result};
use arrow::{
    datatypes::{DataType, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableMetadata {
    pub rows: usize,
    pub bytes: u64,
    pub columns: Vec<ColumnInfo>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetMetadata {
    pub generated_at: String,
    pub source: String,
    pub tables: BTreeMap<String, TableMetadata>,
    pub total_bytes: u64,
}

impl TableMetadata {
    /// Summarize a written table. `bytes` is the size of its Parquet file.
    ///
    /// The date range spans every Date/Timestamp column at once.
    pub fn from_batch(batch: &RecordBatch, bytes: u64) -> Result<Self> {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnInfo {
                name: f.name().clone(),
                ty: type_name(f.data_type()),
            })
            .collect();

        let mut dates = Vec::new();
        for (idx, field) in schema.fields().iter().enumerate() {
            if is_date_like(field.data_type()) {
                let values = to_dates(batch.column(idx))
                    .with_context(|| format!("reading dates from {}", field.name()))?;
                dates.extend(values);
            }
        }
        let range = date_bounds(&dates);

        Ok(Self {
            rows: batch.num_rows(),
            bytes,
            columns,
            min_date: range.map(|(lo, _)| lo.format("%Y-%m-%d").to_string()),
            max_date: range.map(|(_, hi)| hi.format("%Y-%m-%d").to_string()),
        })
    }
}

impl DatasetMetadata {
    /// Stamp a new summary with the current UTC time and the summed byte count.
    pub fn new(source: impl Into<String>, tables: BTreeMap<String, TableMetadata>) -> Self {
        let total_bytes = tables.values().map(|t| t.bytes).sum();
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            source: source.into(),
            tables,
            total_bytes,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON in {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing metadata")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }
}

/// Lowercase Arrow-style type label stored in `columns[].type`.
pub fn type_name(dt: &DataType) -> String {
    match dt {
        DataType::Boolean => "bool".into(),
        DataType::Int8 => "int8".into(),
        DataType::Int16 => "int16".into(),
        DataType::Int32 => "int32".into(),
        DataType::Int64 => "int64".into(),
        DataType::UInt8 => "uint8".into(),
        DataType::UInt16 => "uint16".into(),
        DataType::UInt32 => "uint32".into(),
        DataType::UInt64 => "uint64".into(),
        DataType::Float32 => "float32".into(),
        DataType::Float64 => "float64".into(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string".into(),
        DataType::Dictionary(_, _) => "category".into(),
        DataType::Date32 => "date32[day]".into(),
        DataType::Date64 => "date64[ms]".into(),
        DataType::Timestamp(unit, tz) => {
            let unit = match unit {
                TimeUnit::Second => "s",
                TimeUnit::Millisecond => "ms",
                TimeUnit::Microsecond => "us",
                TimeUnit::Nanosecond => "ns",
            };
            match tz {
                Some(tz) => format!("timestamp[{}, tz={}]", unit, tz),
                None => format!("timestamp[{}]", unit),
            }
        }
        other => format!("{:?}", other).to_lowercase(),
    }
}
