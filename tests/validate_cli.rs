use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use journeydata::{process::write_table, DataLayout, DatasetMetadata, TableMetadata};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use tempfile::tempdir;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_validate_data"))
}

fn run(root: &Path) -> Output {
    Command::new(bin_path())
        .env("CJ_ROOT", root)
        .env("RUST_LOG", "info")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?}: {}", bin_path(), e))
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn write_dataset(root: &Path, products: &[i64]) {
    let layout = DataLayout::new(root);
    let tables: Vec<(&str, RecordBatch)> = vec![
        (
            "transactions",
            RecordBatch::try_from_iter(vec![
                ("product_id", Arc::new(StringArray::from(vec!["1", "2"])) as ArrayRef),
                ("transaction_date", Arc::new(StringArray::from(vec!["2017-01-01", "2017-01-05"])) as ArrayRef),
                ("week", Arc::new(Int64Array::from(vec![1, 1])) as ArrayRef),
                ("day", Arc::new(Int64Array::from(vec![0, 4])) as ArrayRef),
            ])
            .unwrap(),
        ),
        (
            "products",
            RecordBatch::try_from_iter(vec![(
                "product_id",
                Arc::new(Int64Array::from(products.to_vec())) as ArrayRef,
            )])
            .unwrap(),
        ),
        (
            "households",
            RecordBatch::try_from_iter(vec![(
                "household_id",
                Arc::new(StringArray::from(vec!["h1"])) as ArrayRef,
            )])
            .unwrap(),
        ),
    ];

    let mut summary = BTreeMap::new();
    for (name, batch) in tables {
        let bytes = write_table(&batch, layout.table_path(name)).unwrap();
        summary.insert(name.to_string(), TableMetadata::from_batch(&batch, bytes).unwrap());
    }
    DatasetMetadata::new("completejourney test", summary)
        .save(layout.metadata_path())
        .unwrap();
}

#[test]
fn missing_metadata_exits_one_with_error_line() {
    let root = tempdir().unwrap();
    let out = run(root.path());
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stdout(&out),
        "ERROR: Missing data/metadata.json. Run journeydata to generate data.\n"
    );
}

#[test]
fn valid_dataset_exits_zero() {
    let root = tempdir().unwrap();
    write_dataset(root.path(), &[1, 2, 3]);
    let out = run(root.path());
    assert!(out.status.success(), "stdout: {}", stdout(&out));
    assert_eq!(stdout(&out), "Data validation passed.\n");
}

#[test]
fn logs_stay_off_stdout() {
    let root = tempdir().unwrap();
    write_dataset(root.path(), &[1, 2, 3]);
    let out = run(root.path());
    assert_eq!(stdout(&out).lines().count(), 1);
    assert!(String::from_utf8_lossy(&out.stderr).contains("validating"));
}

#[test]
fn dangling_product_exits_one() {
    let root = tempdir().unwrap();
    write_dataset(root.path(), &[1, 3]);
    let out = run(root.path());
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stdout(&out),
        "ERROR: Transactions contain product_id values not found in products.\n"
    );
}
