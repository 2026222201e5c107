pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::{ColumnMapping, CsvFlowSource, LocalStorage};
pub use crate::core::{
    etl::{load_store, ExportEngine, ExportSummary},
    export::{ExportResult, ScenarioExportPipeline},
    join::{JoinReport, JoinedFlowStore},
    query::FlowQueryEngine,
    scenario::{RegionSpec, ScenarioSpec},
};
pub use crate::utils::error::{FlowError, Result};
