pub mod analyze;
pub mod binning;
pub mod etl;
pub mod export;
pub mod geojson;
pub mod join;
pub mod query;
pub mod scenario;

pub use crate::domain::model::{AreaLookup, AreaRecord, Coord, Direction, FlowRecord, JoinedFlow};
pub use crate::domain::ports::{ConfigProvider, FlowSource, Storage};
pub use crate::utils::error::Result;
