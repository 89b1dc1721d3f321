// src/process/parquet.rs

use anyhow::{Context, Result};
use arrow::{compute::concat_batches, record_batch::RecordBatch};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{fs, fs::File, path::Path};
use tracing::{debug, instrument};

/// Write `batch` as a single Parquet file and return its size on disk.
#[instrument(level = "info", skip(batch, path), fields(path = %path.as_ref().display(), rows = batch.num_rows()))]
pub fn write_table(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {:?}", parent))?;
    }

    let file = File::create(path).with_context(|| format!("creating parquet file {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    let bytes = fs::metadata(path)
        .with_context(|| format!("stat {:?}", path))?
        .len();
    debug!(bytes, "wrote parquet");
    Ok(bytes)
}

/// Read a whole Parquet file into one batch.
pub fn read_table(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata from {:?}", path))?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("decoding {:?}", path))?;
    concat_batches(&schema, &batches).context("concatenating batches")
}
