use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::FlowSource;
use crate::domain::model::{AreaRecord, FlowRecord};
use crate::utils::error::{FlowError, Result};

/// 流量表的欄位名稱，載入時立即檢查，不做猜測
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub origin_code: String,
    pub origin_name: String,
    pub dest_code: String,
    pub dest_name: String,
    pub count: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            origin_code: "origin_code".to_string(),
            origin_name: "origin_name".to_string(),
            dest_code: "dest_code".to_string(),
            dest_name: "dest_name".to_string(),
            count: "count".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Header names of the ONS census origin-destination workplace table.
    pub fn ons_odwp01ew() -> Self {
        Self {
            origin_code: "Middle layer Super Output Areas code".to_string(),
            origin_name: "Middle layer Super Output Areas label".to_string(),
            dest_code: "MSOA of workplace code".to_string(),
            dest_name: "MSOA of workplace label".to_string(),
            count: "Count".to_string(),
        }
    }

    fn resolve(&self, source_name: &str, headers: &csv::StringRecord) -> Result<[usize; 5]> {
        let wanted = [
            &self.origin_code,
            &self.origin_name,
            &self.dest_code,
            &self.dest_name,
            &self.count,
        ];
        let mut indices = [0usize; 5];
        for (slot, column) in indices.iter_mut().zip(wanted) {
            *slot = column_index(source_name, headers, column)?;
        }
        Ok(indices)
    }
}

const LOOKUP_COLUMNS: [&str; 4] = ["code", "name", "lat", "lon"];

fn column_index(source_name: &str, headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            FlowError::schema_mismatch(
                source_name,
                format!(
                    "missing column '{}' (found: {})",
                    column,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ),
            )
        })
}

/// 非數字、負數或超出 u64 範圍的流量一律視為 0
pub fn coerce_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        // u64::MAX as f64 == 2^64，嚴格小於才不會被截斷
        Ok(value) if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 => {
            Some(value.trunc() as u64)
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct CsvFlowSource {
    flows_path: PathBuf,
    lookup_path: PathBuf,
    columns: ColumnMapping,
}

impl CsvFlowSource {
    pub fn new(flows_path: impl Into<PathBuf>, lookup_path: impl Into<PathBuf>) -> Self {
        Self {
            flows_path: flows_path.into(),
            lookup_path: lookup_path.into(),
            columns: ColumnMapping::default(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(data) if data.iter().all(|b| b.is_ascii_whitespace()) => Err(FlowError::missing_input(
            path.display().to_string(),
            "file is empty",
        )),
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FlowError::missing_input(
            path.display().to_string(),
            "file not found",
        )),
        Err(e) => Err(FlowError::IoError(e)),
    }
}

pub fn parse_areas(source_name: &str, data: &[u8]) -> Result<Vec<AreaRecord>> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let mut indices = [0usize; 4];
    for (slot, column) in indices.iter_mut().zip(LOOKUP_COLUMNS) {
        *slot = column_index(source_name, &headers, column)?;
    }
    let [code_idx, name_idx, lat_idx, lon_idx] = indices;

    let mut areas = Vec::new();
    let mut without_centroid = 0usize;
    for row in reader.records() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or("").trim();

        let lat = field(lat_idx).parse::<f64>().ok().filter(|v| v.is_finite());
        let lon = field(lon_idx).parse::<f64>().ok().filter(|v| v.is_finite());
        // 沒有座標的區域不進查表，相關流量會在合併時被計為缺少中心點
        let (Some(lat), Some(lon)) = (lat, lon) else {
            without_centroid += 1;
            continue;
        };

        areas.push(AreaRecord {
            code: field(code_idx).to_string(),
            name: field(name_idx).to_string(),
            lat,
            lon,
        });
    }

    if without_centroid > 0 {
        tracing::warn!(
            "⚠️ {}: {} areas skipped without a numeric lat/lon",
            source_name,
            without_centroid
        );
    }
    if areas.is_empty() {
        return Err(FlowError::missing_input(source_name, "no usable area rows"));
    }
    Ok(areas)
}

pub fn parse_flows(source_name: &str, data: &[u8], columns: &ColumnMapping) -> Result<Vec<FlowRecord>> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let [origin_code, origin_name, dest_code, dest_name, count] =
        columns.resolve(source_name, &headers)?;

    let mut flows = Vec::new();
    let mut defaulted = 0usize;
    for row in reader.records() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or("").trim().to_string();

        let value = match coerce_count(row.get(count).unwrap_or("")) {
            Some(value) => value,
            None => {
                defaulted += 1;
                0
            }
        };

        flows.push(FlowRecord {
            origin_code: field(origin_code),
            origin_name: field(origin_name),
            dest_code: field(dest_code),
            dest_name: field(dest_name),
            count: value,
        });
    }

    if defaulted > 0 {
        tracing::warn!(
            "⚠️ {}: {} rows had a non-numeric, negative or out-of-range count and were set to 0",
            source_name,
            defaulted
        );
    }
    if flows.is_empty() {
        return Err(FlowError::missing_input(source_name, "no flow rows"));
    }
    Ok(flows)
}

#[async_trait]
impl FlowSource for CsvFlowSource {
    async fn load_areas(&self) -> Result<Vec<AreaRecord>> {
        let data = read_source(&self.lookup_path).await?;
        parse_areas(&self.lookup_path.display().to_string(), &data)
    }

    async fn load_flows(&self) -> Result<Vec<FlowRecord>> {
        let data = read_source(&self.flows_path).await?;
        parse_flows(&self.flows_path.display().to_string(), &data, &self.columns)
    }
}
