pub mod config;
pub mod fetch;
pub mod logging;
pub mod metadata;
pub mod process;
pub mod publish;
pub mod rdata;
pub mod validate;

pub use config::{Config, DataLayout, SliceOptions};
pub use metadata::{DatasetMetadata, TableMetadata};
pub use validate::{validate_dataset, ValidationError};
