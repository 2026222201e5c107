use serde::Serialize;
use std::collections::HashMap;

use crate::core::scenario::ScenarioSpec;
use crate::domain::model::FlowRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaTotal {
    pub code: String,
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Origin,
    Destination,
}

fn totals_by(flows: &[FlowRecord], side: Side, top: usize) -> Vec<AreaTotal> {
    let mut totals: Vec<AreaTotal> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for flow in flows {
        let key = match side {
            Side::Origin => (flow.origin_code.as_str(), flow.origin_name.as_str()),
            Side::Destination => (flow.dest_code.as_str(), flow.dest_name.as_str()),
        };
        match index.get(&key) {
            Some(&i) => totals[i].total = totals[i].total.saturating_add(flow.count),
            None => {
                index.insert(key, totals.len());
                totals.push(AreaTotal {
                    code: key.0.to_string(),
                    name: key.1.to_string(),
                    total: flow.count,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals.truncate(top);
    totals
}

/// 依總通勤人數排序的起點區域
pub fn top_origins(flows: &[FlowRecord], top: usize) -> Vec<AreaTotal> {
    totals_by(flows, Side::Origin, top)
}

pub fn top_destinations(flows: &[FlowRecord], top: usize) -> Vec<AreaTotal> {
    totals_by(flows, Side::Destination, top)
}

/// "Camden 001" -> "camden-001"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Suggested scenarios: an unfiltered top 1000, plus outflows of the busiest
/// origin and inflows of the busiest destination.
pub fn suggest_scenarios(origins: &[AreaTotal], destinations: &[AreaTotal]) -> Vec<ScenarioSpec> {
    let mut scenarios = vec![ScenarioSpec::new("top1000-geral", 1000)];

    if let Some(origin) = origins.first() {
        scenarios.push(
            ScenarioSpec::new(format!("{}-outflows-top500", slugify(&origin.name)), 500)
                .with_filter("origin_code", origin.code.as_str()),
        );
    }
    if let Some(dest) = destinations.first() {
        scenarios.push(
            ScenarioSpec::new(format!("{}-inflows-top500", slugify(&dest.name)), 500)
                .with_filter("dest_code", dest.code.as_str()),
        );
    }
    scenarios
}
