//! Decoder for R's `save()` files (`.rda` / `.RData`).

pub mod buffer;
pub mod decompress;
pub mod error;
pub mod frame;
pub mod object;
pub mod parse;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RDataError, Result};
pub use frame::{data_frame_to_batch, is_data_frame};
pub use object::{RObject, RValue};
pub use parse::parse_rdata;

use arrow::record_batch::RecordBatch;
use std::{fs, path::Path};
use tracing::{debug, instrument};

/// Read one `.rda` file and convert every data frame in it, in file order.
/// Objects that are not data frames are skipped.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_data_frames(path: impl AsRef<Path>) -> Result<Vec<(String, RecordBatch)>> {
    let bytes = fs::read(path.as_ref())?;
    let objects = parse_rdata(&bytes)?;

    let mut frames = Vec::with_capacity(objects.len());
    for (name, obj) in objects {
        if !is_data_frame(&obj) {
            debug!(object = %name, classes = ?obj.classes(), "skipping non-data-frame object");
            continue;
        }
        let batch = data_frame_to_batch(&name, &obj)?;
        debug!(table = %name, rows = batch.num_rows(), columns = batch.num_columns(), "decoded data frame");
        frames.push((name, batch));
    }
    Ok(frames)
}
