// src/validate/mod.rs
//
// Read-only integrity checks over a published dataset. Checks run in a fixed
// order and stop at the first failure.

use crate::config::DataLayout;
use crate::metadata::DatasetMetadata;
use crate::process::read_table;
use arrow::{error::ArrowError, record_batch::RecordBatch};
use std::{collections::HashSet, path::PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod checks;

use checks::{
    check_date_column, date_columns, has_dangling, has_duplicates, has_negative, pair_keys,
    string_keys, DateColumn,
};

pub const REQUIRED_TABLES: [&str; 3] = ["transactions", "products", "households"];

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing data/metadata.json. Run journeydata to generate data.")]
    MissingMetadata,

    #[error("Metadata file data/metadata.json is invalid: {0}")]
    InvalidMetadata(String),

    #[error("Metadata missing table entry: {0}")]
    MissingTableEntry(String),

    #[error("Missing parquet file: {}", .0.display())]
    MissingParquet(PathBuf),

    #[error("Failed to load parquet file {}: {reason}", .path.display())]
    UnreadableParquet { path: PathBuf, reason: String },

    #[error("{0} table has no rows.")]
    EmptyTable(&'static str),

    #[error("Products.product_id has duplicates.")]
    DuplicateProducts,

    #[error("Transactions contain product_id values not found in products.")]
    UnknownProducts,

    #[error("Date column {0} could not be parsed.")]
    UnparseableDate(String),

    #[error("Date column {0} has invalid range.")]
    InvalidDateRange(String),

    #[error("Transactions.{0} has negative values.")]
    NegativeValues(&'static str),

    #[error("Coupon redemptions reference missing coupons.")]
    UnknownCoupons,

    #[error("Column {column} could not be compared: {source}")]
    Column {
        column: String,
        #[source]
        source: ArrowError,
    },
}

fn column_error(column: &str) -> impl FnOnce(ArrowError) -> ValidationError + '_ {
    move |source| ValidationError::Column {
        column: column.to_string(),
        source,
    }
}

fn load(layout: &DataLayout, table: &str) -> Result<RecordBatch, ValidationError> {
    let path = layout.table_path(table);
    if !path.exists() {
        return Err(ValidationError::MissingParquet(path));
    }
    read_table(&path).map_err(|e| ValidationError::UnreadableParquet {
        reason: format!("{:#}", e),
        path,
    })
}

fn require_rows(batch: &RecordBatch, label: &'static str) -> Result<(), ValidationError> {
    if batch.num_rows() == 0 {
        return Err(ValidationError::EmptyTable(label));
    }
    Ok(())
}

/// Run every check against the dataset under `layout`.
pub fn validate_dataset(layout: &DataLayout) -> Result<(), ValidationError> {
    let meta_path = layout.metadata_path();
    if !meta_path.exists() {
        return Err(ValidationError::MissingMetadata);
    }
    let metadata = DatasetMetadata::load(&meta_path)
        .map_err(|e| ValidationError::InvalidMetadata(format!("{:#}", e)))?;
    for table in REQUIRED_TABLES {
        if !metadata.tables.contains_key(table) {
            return Err(ValidationError::MissingTableEntry(table.to_string()));
        }
    }
    debug!(path = %meta_path.display(), "metadata ok");

    let transactions = load(layout, "transactions")?;
    let products = load(layout, "products")?;
    let households = load(layout, "households")?;

    require_rows(&transactions, "Transactions")?;
    require_rows(&products, "Products")?;
    require_rows(&households, "Households")?;

    if let Some(ids) = products.column_by_name("product_id") {
        let product_ids = string_keys(ids).map_err(column_error("product_id"))?;
        if has_duplicates(&product_ids) {
            return Err(ValidationError::DuplicateProducts);
        }
        if let Some(tx_ids) = transactions.column_by_name("product_id") {
            let tx_ids = string_keys(tx_ids).map_err(column_error("product_id"))?;
            if has_dangling(&tx_ids, &product_ids) {
                return Err(ValidationError::UnknownProducts);
            }
        }
    }

    for name in date_columns(&transactions) {
        let Some(column) = transactions.column_by_name(&name) else {
            continue;
        };
        match check_date_column(column) {
            DateColumn::Valid => {}
            DateColumn::Unparseable => return Err(ValidationError::UnparseableDate(name)),
            DateColumn::InvalidRange => return Err(ValidationError::InvalidDateRange(name)),
        }
    }

    for name in ["week", "day"] {
        if let Some(column) = transactions.column_by_name(name) {
            if has_negative(column).map_err(column_error(name))? {
                return Err(ValidationError::NegativeValues(name));
            }
        }
    }

    check_coupons(layout)?;

    info!(
        transactions = transactions.num_rows(),
        products = products.num_rows(),
        households = households.num_rows(),
        "dataset valid"
    );
    Ok(())
}

fn check_coupons(layout: &DataLayout) -> Result<(), ValidationError> {
    let redemptions_path = layout.table_path("coupon_redemptions");
    let coupons_path = layout.table_path("coupons");
    if !redemptions_path.exists() || !coupons_path.exists() {
        debug!("coupon tables absent; skipping coupon check");
        return Ok(());
    }
    let redemptions = load(layout, "coupon_redemptions")?;
    let coupons = load(layout, "coupons")?;

    let pairs = |batch: &RecordBatch| {
        pair_keys(batch, "coupon_upc", "campaign_id").map_err(column_error("coupon_upc"))
    };
    let (Some(redeemed), Some(known)) = (pairs(&redemptions)?, pairs(&coupons)?) else {
        return Ok(());
    };
    let known: HashSet<_> = known.into_iter().collect();
    if redeemed.iter().any(|pair| !known.contains(pair)) {
        return Err(ValidationError::UnknownCoupons);
    }
    Ok(())
}
