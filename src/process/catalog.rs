// src/process/catalog.rs

use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Source object name → canonical table name. Names not listed pass through.
static TABLE_RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("demographics", "households"),
        ("transactions_sample", "transactions"),
        ("campaign_desc", "campaign_descriptions"),
    ])
});

pub fn canonical_name(source: &str) -> &str {
    TABLE_RENAMES.get(source).copied().unwrap_or(source)
}

#[derive(Debug, Clone)]
pub struct NamedTable {
    /// Canonical output name, also the Parquet file stem.
    pub name: String,
    /// Object name inside the `.rda` file.
    pub source: String,
    pub batch: RecordBatch,
}

/// Tables keyed by canonical name, in first-seen order.
#[derive(Debug, Default)]
pub struct TableCatalog {
    tables: Vec<NamedTable>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decoded table under its canonical name.
    /// The first table to claim a name keeps it; later claimants are dropped with a warning.
    pub fn insert(&mut self, source: &str, batch: RecordBatch) -> bool {
        let name = canonical_name(source);
        if let Some(existing) = self.get(name) {
            warn!(
                table = %name,
                kept = %existing.source,
                discarded = %source,
                rows = batch.num_rows(),
                "duplicate canonical table name; keeping first"
            );
            return false;
        }
        debug!(table = %name, source = %source, rows = batch.num_rows(), "catalogued");
        self.tables.push(NamedTable {
            name: name.to_string(),
            source: source.to_string(),
            batch,
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&NamedTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedTable> {
        self.tables.iter()
    }

    pub fn into_tables(self) -> Vec<NamedTable> {
        self.tables
    }
}
