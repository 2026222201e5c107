use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::model::{AreaLookup, FlowRecord};
use crate::utils::error::{FlowError, Result};
use crate::utils::validation::validate_file_stem;

/// 倫敦中心區的關鍵字（對應 central-london 預設）
pub const CENTRAL_LONDON_KEYWORDS: [&str; 15] = [
    "City of London",
    "Westminster",
    "Camden",
    "Islington",
    "Hackney",
    "Tower Hamlets",
    "Greenwich",
    "Lewisham",
    "Southwark",
    "Lambeth",
    "Wandsworth",
    "Hammersmith",
    "Kensington",
    "Newham",
    "Waltham Forest",
];

pub const DEFAULT_TOP_N: i64 = 1000;

fn default_top_n() -> i64 {
    DEFAULT_TOP_N
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default)]
    pub filter: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_top_n")]
    pub top_n: i64,
    /// 只保留目的地落在某個區域群組內的流量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_region: Option<RegionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionSpec {
    Preset(String),
    Keywords(Vec<String>),
}

impl RegionSpec {
    pub fn keywords(&self) -> Option<Vec<String>> {
        match self {
            Self::Preset(name) => match name.as_str() {
                "central-london" => Some(
                    CENTRAL_LONDON_KEYWORDS
                        .iter()
                        .map(|k| k.to_string())
                        .collect(),
                ),
                _ => None,
            },
            Self::Keywords(keywords) => Some(keywords.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowField {
    OriginCode,
    OriginName,
    DestCode,
    DestName,
    Count,
}

impl FlowField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "origin_code" => Some(Self::OriginCode),
            "origin_name" => Some(Self::OriginName),
            "dest_code" => Some(Self::DestCode),
            "dest_name" => Some(Self::DestName),
            "count" => Some(Self::Count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExpectedValue {
    Text(String),
    Integer(i64),
}

/// 單一欄位的精確比對條件
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: String,
    target: Option<FlowField>,
    expected: ExpectedValue,
}

impl FieldPredicate {
    fn parse(scenario: &str, field: &str, value: &serde_json::Value) -> Result<Self> {
        let expected = match value {
            serde_json::Value::String(s) => ExpectedValue::Text(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ExpectedValue::Integer(i),
                None => {
                    return Err(FlowError::invalid_scenario(
                        scenario,
                        format!("filter '{}' must be an integer, got {}", field, n),
                    ))
                }
            },
            other => {
                return Err(FlowError::invalid_scenario(
                    scenario,
                    format!("filter '{}' must be a string or integer, got {}", field, other),
                ))
            }
        };

        Ok(Self {
            field: field.to_string(),
            target: FlowField::parse(field),
            expected,
        })
    }

    /// 不存在的欄位、或型別不符，一律視為不符合
    pub fn matches(&self, flow: &FlowRecord) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        match (&self.expected, target) {
            (ExpectedValue::Text(v), FlowField::OriginCode) => flow.origin_code == *v,
            (ExpectedValue::Text(v), FlowField::OriginName) => flow.origin_name == *v,
            (ExpectedValue::Text(v), FlowField::DestCode) => flow.dest_code == *v,
            (ExpectedValue::Text(v), FlowField::DestName) => flow.dest_name == *v,
            (ExpectedValue::Integer(v), FlowField::Count) => {
                u64::try_from(*v).is_ok_and(|v| flow.count == v)
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match &self.expected {
            ExpectedValue::Text(v) => format!("{}={}", self.field, v),
            ExpectedValue::Integer(v) => format!("{}={}", self.field, v),
        }
    }
}

/// A scenario checked and compiled against the area lookup, ready to run.
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    pub name: String,
    pub top_n: usize,
    pub predicates: Vec<FieldPredicate>,
    pub dest_region: Option<HashSet<String>>,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, top_n: i64) -> Self {
        Self {
            name: name.into(),
            filter: BTreeMap::new(),
            top_n,
            dest_region: None,
        }
    }

    pub fn with_filter(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.filter.insert(field.to_string(), value.into());
        self
    }

    pub fn with_dest_region(mut self, region: RegionSpec) -> Self {
        self.dest_region = Some(region);
        self
    }

    pub fn compile(&self, areas: &AreaLookup) -> Result<CompiledScenario> {
        validate_file_stem("name", &self.name)
            .map_err(|e| FlowError::invalid_scenario(&self.name, e.to_string()))?;

        if self.top_n <= 0 {
            return Err(FlowError::invalid_scenario(
                &self.name,
                format!("top_n must be positive, got {}", self.top_n),
            ));
        }
        let top_n = usize::try_from(self.top_n)
            .map_err(|_| FlowError::invalid_scenario(&self.name, "top_n is too large"))?;

        let predicates = self
            .filter
            .iter()
            .map(|(field, value)| FieldPredicate::parse(&self.name, field, value))
            .collect::<Result<Vec<_>>>()?;

        let dest_region = match &self.dest_region {
            None => None,
            Some(region) => {
                let keywords = region.keywords().ok_or_else(|| {
                    FlowError::invalid_scenario(&self.name, format!("unknown region preset {:?}", region))
                })?;
                if keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(FlowError::invalid_scenario(
                        &self.name,
                        "dest_region needs at least one non-empty keyword",
                    ));
                }
                Some(region_members(areas, &keywords))
            }
        };

        Ok(CompiledScenario {
            name: self.name.clone(),
            top_n,
            predicates,
            dest_region,
        })
    }
}

/// 名稱包含任一關鍵字（不分大小寫）的區域代碼
pub fn region_members(areas: &AreaLookup, keywords: &[String]) -> HashSet<String> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    areas
        .iter()
        .filter(|area| {
            let name = area.name.to_lowercase();
            needles.iter().any(|needle| name.contains(needle.as_str()))
        })
        .map(|area| area.code.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::join::fixtures::{area, flow};
    use serde_json::json;

    fn london_lookup() -> AreaLookup {
        AreaLookup::from_records(vec![
            area("E1", "Camden 001", 51.54, -0.14),
            area("E2", "WESTMINSTER 010", 51.50, -0.13),
            area("E3", "Oxford 004", 51.75, -1.25),
            area("E4", "Royal Borough of Kensington and Chelsea 002", 51.50, -0.19),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_non_positive_top_n() {
        let lookup = london_lookup();
        for top_n in [0, -1] {
            let err = ScenarioSpec::new("bad", top_n).compile(&lookup).unwrap_err();
            assert!(matches!(err, FlowError::InvalidScenario { .. }));
        }
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let lookup = london_lookup();
        assert!(ScenarioSpec::new("../etc", 10).compile(&lookup).is_err());
        assert!(ScenarioSpec::new("", 10).compile(&lookup).is_err());
    }

    #[test]
    fn test_rejects_non_scalar_filter_values() {
        let lookup = london_lookup();
        let spec = ScenarioSpec::new("s", 10).with_filter("origin_code", json!(["E1"]));
        assert!(matches!(
            spec.compile(&lookup),
            Err(FlowError::InvalidScenario { .. })
        ));
        let spec = ScenarioSpec::new("s", 10).with_filter("count", json!(1.5));
        assert!(spec.compile(&lookup).is_err());
    }

    #[test]
    fn test_unknown_field_matches_nothing() {
        let lookup = london_lookup();
        let compiled = ScenarioSpec::new("s", 10)
            .with_filter("mode", "bus")
            .compile(&lookup)
            .unwrap();
        assert!(!compiled.predicates[0].matches(&flow("E1", "E2", 3)));
    }

    #[test]
    fn test_predicates_are_exact() {
        let lookup = london_lookup();
        let compiled = ScenarioSpec::new("s", 10)
            .with_filter("origin_code", "E1")
            .with_filter("count", 3)
            .compile(&lookup)
            .unwrap();
        let by_field = |f: &str| compiled.predicates.iter().find(|p| p.field == f).unwrap();

        assert!(by_field("origin_code").matches(&flow("E1", "E2", 3)));
        assert!(!by_field("origin_code").matches(&flow("E11", "E2", 3)));
        assert!(by_field("count").matches(&flow("E1", "E2", 3)));
        assert!(!by_field("count").matches(&flow("E1", "E2", 30)));
    }

    #[test]
    fn test_string_value_never_matches_count() {
        let lookup = london_lookup();
        let compiled = ScenarioSpec::new("s", 10)
            .with_filter("count", "3")
            .compile(&lookup)
            .unwrap();
        assert!(!compiled.predicates[0].matches(&flow("E1", "E2", 3)));
    }

    #[test]
    fn test_region_membership_is_case_insensitive_substring() {
        let lookup = london_lookup();
        let members = region_members(&lookup, &["westminster".to_string(), "Kensington".to_string()]);
        let mut members: Vec<String> = members.into_iter().collect();
        members.sort();
        assert_eq!(members, vec!["E2", "E4"]);
    }

    #[test]
    fn test_central_london_preset() {
        let lookup = london_lookup();
        let compiled = ScenarioSpec::new("london", 5000)
            .with_dest_region(RegionSpec::Preset("central-london".to_string()))
            .compile(&lookup)
            .unwrap();
        let members = compiled.dest_region.unwrap();
        assert_eq!(members.len(), 3);
        assert!(!members.contains("E3"));
    }

    #[test]
    fn test_unknown_preset_is_invalid() {
        let lookup = london_lookup();
        let spec = ScenarioSpec::new("s", 10)
            .with_dest_region(RegionSpec::Preset("atlantis".to_string()));
        assert!(matches!(
            spec.compile(&lookup),
            Err(FlowError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let spec: ScenarioSpec = toml::from_str(
            r#"
name = "camden-outflows-top500"
top_n = 500
filter = { origin_code = "E1" }
dest_region = ["camden", "islington"]
"#,
        )
        .unwrap();
        assert_eq!(spec.filter["origin_code"], json!("E1"));
        assert_eq!(
            spec.dest_region,
            Some(RegionSpec::Keywords(vec!["camden".into(), "islington".into()]))
        );

        let spec: ScenarioSpec = toml::from_str(r#"name = "top""#).unwrap();
        assert_eq!(spec.top_n, DEFAULT_TOP_N);
        assert!(spec.filter.is_empty());
    }
}
