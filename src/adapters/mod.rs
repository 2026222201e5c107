// Adapters layer: concrete implementations for external systems (files on disk, CSV sources).

pub mod csv_source;
pub mod storage;

pub use csv_source::{ColumnMapping, CsvFlowSource};
pub use storage::LocalStorage;
