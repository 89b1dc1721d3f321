// src/process/mod.rs

use crate::config::SliceOptions;
use crate::metadata::{DatasetMetadata, TableMetadata};
use crate::rdata;
use anyhow::{Context, Result};
use glob::glob;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, instrument};

pub mod catalog;
pub mod derive;
pub mod parquet;
pub mod slice;
pub mod temporal;

pub use catalog::{canonical_name, NamedTable, TableCatalog};
pub use derive::derive_calendar_columns;
pub use parquet::{read_table, write_table};
pub use slice::apply_slicing;

pub const TRANSACTIONS: &str = "transactions";

/// R data files directly under `data_dir`, in sorted path order.
pub fn find_rda_files(data_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let data_dir = data_dir.as_ref();
    let mut files = Vec::new();
    for ext in ["rda", "RData", "rdata"] {
        let pattern = format!("{}/*.{}", data_dir.display(), ext);
        for entry in glob(&pattern).with_context(|| format!("Failed to read glob pattern '{}'", pattern))? {
            files.push(entry.with_context(|| format!("reading entry for '{}'", pattern))?);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Decode every data frame in `files` into a catalog keyed by canonical name.
pub fn collect_tables(files: &[PathBuf]) -> Result<TableCatalog> {
    let mut catalog = TableCatalog::new();
    for path in files {
        let frames = rdata::read_data_frames(path)
            .with_context(|| format!("decoding {}", path.display()))?;
        for (source, batch) in frames {
            catalog.insert(&source, batch);
        }
    }
    Ok(catalog)
}

/// Derived calendar columns and optional slicing; other tables pass through untouched.
pub fn transform_table(table: NamedTable, slice: &SliceOptions) -> Result<NamedTable> {
    if table.name != TRANSACTIONS {
        return Ok(table);
    }
    let batch = derive_calendar_columns(&table.batch)?;
    let batch = apply_slicing(&batch, slice)?;
    Ok(NamedTable { batch, ..table })
}

/// Decode, transform and write every table under `out_dir/<name>.parquet`.
/// Returns the metadata summary for what was written.
#[instrument(level = "info", skip(files, out_dir, slice), fields(files = files.len()))]
pub fn build_dataset(
    files: &[PathBuf],
    out_dir: impl AsRef<Path>,
    slice: &SliceOptions,
    source: &str,
) -> Result<DatasetMetadata> {
    let out_dir = out_dir.as_ref();
    let start = Instant::now();

    let catalog = collect_tables(files)?;
    info!(tables = catalog.len(), "decoded source tables");

    let mut tables = BTreeMap::new();
    for table in catalog.into_tables() {
        let table = transform_table(table, slice).context("transforming transactions")?;
        let path = out_dir.join(format!("{}.parquet", table.name));
        let bytes = write_table(&table.batch, &path)
            .with_context(|| format!("writing table {}", table.name))?;
        let meta = TableMetadata::from_batch(&table.batch, bytes)
            .with_context(|| format!("summarizing table {}", table.name))?;
        info!(table = %table.name, rows = meta.rows, bytes, "wrote table");
        tables.insert(table.name, meta);
    }

    let metadata = DatasetMetadata::new(source, tables);
    info!(total_bytes = metadata.total_bytes, elapsed = ?start.elapsed(), "dataset built");
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataLayout;
    use crate::rdata::testing::XdrWriter;
    use crate::{publish::publish, validate_dataset};
    use std::fs;
    use tempfile::tempdir;

    // 2017-01-01T08:00:00Z in seconds
    const JAN_1_2017_8AM: f64 = 1_483_257_600.0;

    /// Write `name <- data.frame(...)` as a gzip'd `.rda`; `columns` writes the
    /// column vectors in order.
    fn write_frame(dir: &Path, name: &str, names: &[&str], rows: i32, columns: impl FnOnce(&mut XdrWriter)) -> PathBuf {
        let mut w = XdrWriter::rdx3();
        w.pairlist_node(true, false);
        w.symbol(name);
        w.list_header(names.len(), true);
        columns(&mut w);
        w.str_attr("names", names);
        w.compact_row_names(rows);
        w.str_attr("class", &["data.frame"]);
        w.nil();
        w.nil();
        let path = dir.join(format!("{}.rda", name));
        fs::write(&path, w.finish_gzip()).unwrap();
        path
    }

    fn package_data(dir: &Path) {
        write_frame(dir, "transactions_sample", &["product_id", "transaction_timestamp"], 3, |w| {
            w.str_vector(&[Some("1"), Some("2"), Some("2")], false);
            w.real_vector(
                &[JAN_1_2017_8AM, JAN_1_2017_8AM + 86_400.0, JAN_1_2017_8AM + 8.0 * 86_400.0],
                true,
            );
            w.str_attr("class", &["POSIXct", "POSIXt"]);
            w.str_attr("tzone", &["UTC"]);
            w.nil();
        });
        write_frame(dir, "products", &["product_id"], 2, |w| {
            w.int_vector(&[Some(1), Some(2)], false);
        });
        write_frame(dir, "demographics", &["household_id"], 1, |w| {
            w.str_vector(&[Some("h1")], false);
        });
    }

    #[test]
    fn finds_rda_files_sorted() {
        let dir = tempdir().unwrap();
        for f in ["b.rda", "a.RData", "notes.txt", "c.rdata"] {
            fs::write(dir.path().join(f), b"").unwrap();
        }
        let names: Vec<_> = find_rda_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.RData", "b.rda", "c.rdata"]);
    }

    #[test]
    fn collects_under_canonical_names() {
        let dir = tempdir().unwrap();
        package_data(dir.path());
        let files = find_rda_files(dir.path()).unwrap();
        let catalog = collect_tables(&files).unwrap();
        assert_eq!(catalog.len(), 3);
        for name in ["transactions", "products", "households"] {
            assert!(catalog.get(name).is_some(), "missing {}", name);
        }
        assert_eq!(catalog.get("households").unwrap().source, "demographics");
    }

    #[test]
    fn builds_publishes_and_validates() {
        let pkg = tempdir().unwrap();
        let root = tempdir().unwrap();
        let staging = tempdir().unwrap();
        package_data(pkg.path());

        let files = find_rda_files(pkg.path()).unwrap();
        let metadata = build_dataset(&files, staging.path(), &SliceOptions::default(), "completejourney 1.1.0").unwrap();

        let tx = &metadata.tables[TRANSACTIONS];
        assert_eq!(tx.rows, 3);
        assert_eq!(tx.min_date.as_deref(), Some("2017-01-01"));
        assert_eq!(tx.max_date.as_deref(), Some("2017-01-09"));
        let cols: Vec<_> = tx.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cols, ["product_id", "transaction_timestamp", "transaction_date", "week", "day"]);
        assert_eq!(
            metadata.total_bytes,
            metadata.tables.values().map(|t| t.bytes).sum::<u64>()
        );

        let layout = DataLayout::new(root.path());
        publish(staging.path(), &metadata, &layout).unwrap();
        validate_dataset(&layout).unwrap();

        let back = read_table(layout.table_path(TRANSACTIONS)).unwrap();
        assert_eq!(back.num_rows(), 3);
    }

    #[test]
    fn row_slice_applies_to_transactions_only() {
        let pkg = tempdir().unwrap();
        let staging = tempdir().unwrap();
        package_data(pkg.path());

        let files = find_rda_files(pkg.path()).unwrap();
        let slice = SliceOptions { rows: Some(1), weeks: None };
        let metadata = build_dataset(&files, staging.path(), &slice, "completejourney 1.1.0").unwrap();
        assert_eq!(metadata.tables[TRANSACTIONS].rows, 1);
        assert_eq!(metadata.tables["products"].rows, 2);

        let written = read_table(staging.path().join("transactions.parquet")).unwrap();
        assert_eq!(written.num_rows(), 1);
        let products = read_table(staging.path().join("products.parquet")).unwrap();
        assert_eq!(products.num_rows(), 2);
    }

    #[test]
    fn row_slice_larger_than_table_keeps_every_row() {
        let pkg = tempdir().unwrap();
        let staging = tempdir().unwrap();
        package_data(pkg.path());

        let files = find_rda_files(pkg.path()).unwrap();
        let slice = SliceOptions { rows: Some(50), weeks: None };
        build_dataset(&files, staging.path(), &slice, "completejourney 1.1.0").unwrap();
        let written = read_table(staging.path().join("transactions.parquet")).unwrap();
        assert_eq!(written.num_rows(), 3);
    }
}
