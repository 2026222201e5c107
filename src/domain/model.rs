use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{FlowError, Result};

/// 區域中心點 (lat, lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// GeoJSON 座標順序為 [lon, lat]
    pub fn to_position(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl AreaRecord {
    pub fn centroid(&self) -> Coord {
        Coord::new(self.lat, self.lon)
    }
}

/// 區域代碼 -> AreaRecord，載入後不可變
#[derive(Debug, Clone, Default)]
pub struct AreaLookup {
    areas: HashMap<String, AreaRecord>,
    order: Vec<String>,
}

impl AreaLookup {
    /// 代碼必須非空且唯一
    pub fn from_records(records: Vec<AreaRecord>) -> Result<Self> {
        let mut lookup = Self::default();
        for record in records {
            if record.code.trim().is_empty() {
                return Err(FlowError::schema_mismatch(
                    "area lookup",
                    format!("area named '{}' has an empty code", record.name),
                ));
            }
            if lookup.areas.contains_key(&record.code) {
                return Err(FlowError::schema_mismatch(
                    "area lookup",
                    format!("duplicate area code '{}'", record.code),
                ));
            }
            lookup.order.push(record.code.clone());
            lookup.areas.insert(record.code.clone(), record);
        }
        Ok(lookup)
    }

    pub fn get(&self, code: &str) -> Option<&AreaRecord> {
        self.areas.get(code)
    }

    pub fn centroid(&self, code: &str) -> Option<Coord> {
        self.areas.get(code).map(AreaRecord::centroid)
    }

    /// 依載入順序走訪
    pub fn iter(&self) -> impl Iterator<Item = &AreaRecord> {
        self.order.iter().filter_map(|code| self.areas.get(code))
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub origin_code: String,
    pub origin_name: String,
    pub dest_code: String,
    pub dest_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedFlow {
    pub flow: FlowRecord,
    pub origin_coord: Coord,
    pub dest_coord: Coord,
}

impl JoinedFlow {
    pub fn count(&self) -> u64 {
        self.flow.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }

    /// incoming 比對目的地，outgoing 比對起點
    pub fn touches(&self, flow: &FlowRecord, area_code: &str) -> bool {
        match self {
            Self::Incoming => flow.dest_code == area_code,
            Self::Outgoing => flow.origin_code == area_code,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            other => Err(FlowError::invalid_argument(
                "direction",
                format!("expected 'incoming' or 'outgoing', got '{}'", other),
            )),
        }
    }
}
