use serde::{Deserialize, Serialize};

use crate::core::binning;
use crate::domain::model::JoinedFlow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: FlowProperties,
    pub geometry: LineString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowProperties {
    pub origin_code: String,
    pub origin_name: String,
    pub dest_code: String,
    pub dest_name: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_bin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

/// 是否加上 count_bin（API 回應不加，批次匯出會加）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinAnnotation {
    None,
    CountBin,
}

impl Feature {
    pub fn from_flow(joined: &JoinedFlow, annotation: BinAnnotation) -> Self {
        let flow = &joined.flow;
        let count_bin = match annotation {
            BinAnnotation::None => None,
            BinAnnotation::CountBin => Some(binning::bin(flow.count).to_string()),
        };

        Self {
            kind: "Feature".to_string(),
            properties: FlowProperties {
                origin_code: flow.origin_code.clone(),
                origin_name: flow.origin_name.clone(),
                dest_code: flow.dest_code.clone(),
                dest_name: flow.dest_name.clone(),
                count: flow.count,
                count_bin,
            },
            geometry: LineString {
                kind: "LineString".to_string(),
                coordinates: vec![
                    joined.origin_coord.to_position(),
                    joined.dest_coord.to_position(),
                ],
            },
        }
    }
}

impl FeatureCollection {
    pub fn from_flows<'a>(
        name: Option<&str>,
        flows: impl IntoIterator<Item = &'a JoinedFlow>,
        annotation: BinAnnotation,
    ) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            name: name.map(str::to_string),
            features: flows
                .into_iter()
                .map(|flow| Feature::from_flow(flow, annotation))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Coord, FlowRecord};

    fn joined(count: u64) -> JoinedFlow {
        JoinedFlow {
            flow: FlowRecord {
                origin_code: "E02000001".to_string(),
                origin_name: "City of London 001".to_string(),
                dest_code: "E02000977".to_string(),
                dest_name: "Westminster 018".to_string(),
                count,
            },
            origin_coord: Coord::new(51.515, -0.093),
            dest_coord: Coord::new(51.512, -0.135),
        }
    }

    #[test]
    fn test_feature_geometry_is_lon_lat_origin_first() {
        let feature = Feature::from_flow(&joined(12), BinAnnotation::None);
        assert_eq!(
            feature.geometry.coordinates,
            vec![[-0.093, 51.515], [-0.135, 51.512]]
        );
        assert_eq!(feature.geometry.kind, "LineString");
    }

    #[test]
    fn test_api_feature_has_no_count_bin() {
        let feature = Feature::from_flow(&joined(12), BinAnnotation::None);
        let value = serde_json::to_value(&feature).unwrap();
        let properties = value["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 5);
        assert!(properties["count"].is_u64());
        assert!(!properties.contains_key("count_bin"));
    }

    #[test]
    fn test_export_feature_properties_are_exact() {
        let feature = Feature::from_flow(&joined(12), BinAnnotation::CountBin);
        let value = serde_json::to_value(&feature).unwrap();
        let mut keys: Vec<&String> = value["properties"].as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["count", "count_bin", "dest_code", "dest_name", "origin_code", "origin_name"]
        );
        assert_eq!(value["properties"]["count_bin"], "10-50");
    }

    #[test]
    fn test_collection_shape() {
        let flows = vec![joined(1), joined(2)];
        let collection = FeatureCollection::from_flows(Some("demo"), &flows, BinAnnotation::None);
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["name"], "demo");
        assert_eq!(value["features"].as_array().unwrap().len(), 2);

        let unnamed = FeatureCollection::from_flows(None, &flows, BinAnnotation::None);
        assert!(serde_json::to_value(&unnamed).unwrap().get("name").is_none());
    }
}
