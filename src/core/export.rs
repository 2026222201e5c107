use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::core::geojson::{BinAnnotation, FeatureCollection};
use crate::core::join::{rank_by_count, JoinedFlowStore};
use crate::core::scenario::{CompiledScenario, ScenarioSpec};
use crate::domain::model::JoinedFlow;
use crate::utils::error::{FlowError, Result};

const TOP_DESTINATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationTotal {
    pub dest_name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioStats {
    pub min_count: Option<u64>,
    pub max_count: Option<u64>,
    pub top_destinations: Vec<DestinationTotal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub name: String,
    pub feature_count: usize,
    /// GeoJSON FeatureCollection 文字
    pub output: String,
    pub stats: ScenarioStats,
}

impl ExportResult {
    pub fn file_name(&self) -> String {
        format!("{}.geojson", self.name)
    }
}

/// Runs declared scenarios against the joined store. Each scenario is
/// independent; they run in parallel and results keep declaration order.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioExportPipeline<'a> {
    store: &'a JoinedFlowStore,
}

impl<'a> ScenarioExportPipeline<'a> {
    pub fn new(store: &'a JoinedFlowStore) -> Self {
        Self { store }
    }

    /// 同名 scenario 只執行第一個，之後的回傳 InvalidScenario (輸出檔名會相撞)
    pub fn run(&self, scenarios: &[ScenarioSpec]) -> Vec<Result<ExportResult>> {
        let mut seen = HashSet::new();
        let repeated: Vec<bool> = scenarios
            .iter()
            .map(|scenario| !seen.insert(scenario.name.as_str()))
            .collect();

        scenarios
            .par_iter()
            .zip(repeated.par_iter())
            .map(|(scenario, &repeated)| {
                if repeated {
                    tracing::warn!("⚠️ Scenario {} is declared more than once", scenario.name);
                    return Err(FlowError::invalid_scenario(
                        &scenario.name,
                        "duplicate scenario name",
                    ));
                }
                self.run_one(scenario)
            })
            .collect()
    }

    pub fn run_one(&self, scenario: &ScenarioSpec) -> Result<ExportResult> {
        let compiled = scenario.compile(self.store.areas())?;
        let selected = self.select(&compiled);

        let collection = FeatureCollection::from_flows(
            Some(compiled.name.as_str()),
            selected.iter().copied(),
            BinAnnotation::CountBin,
        );
        let output = serde_json::to_string(&collection)?;
        let stats = scenario_stats(&selected);

        tracing::info!(
            "✅ Scenario {}: {} features (count {}..{})",
            compiled.name,
            collection.len(),
            stats.min_count.unwrap_or(0),
            stats.max_count.unwrap_or(0)
        );

        Ok(ExportResult {
            name: compiled.name,
            feature_count: collection.features.len(),
            output,
            stats,
        })
    }

    /// 區域前置篩選 -> 欄位條件 (AND) -> 依流量排序 -> 取前 top_n
    fn select(&self, scenario: &CompiledScenario) -> Vec<&'a JoinedFlow> {
        let mut remaining: Vec<&JoinedFlow> = self.store.flows().iter().collect();

        if let Some(members) = &scenario.dest_region {
            let before = remaining.len();
            remaining.retain(|joined| members.contains(&joined.flow.dest_code));
            tracing::debug!(
                "   {}: destination region ({} areas): {} -> {} flows",
                scenario.name,
                members.len(),
                before,
                remaining.len()
            );
        }

        for predicate in &scenario.predicates {
            let before = remaining.len();
            remaining.retain(|joined| predicate.matches(&joined.flow));
            tracing::debug!(
                "   {}: filter {}: {} -> {} flows",
                scenario.name,
                predicate.describe(),
                before,
                remaining.len()
            );
        }

        rank_by_count(&mut remaining);
        remaining.truncate(scenario.top_n);
        remaining
    }
}

fn scenario_stats(flows: &[&JoinedFlow]) -> ScenarioStats {
    let mut totals: Vec<DestinationTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for joined in flows {
        let name = joined.flow.dest_name.as_str();
        match index.get(name) {
            Some(&i) => totals[i].total = totals[i].total.saturating_add(joined.count()),
            None => {
                index.insert(name, totals.len());
                totals.push(DestinationTotal {
                    dest_name: name.to_string(),
                    total: joined.count(),
                });
            }
        }
    }
    // stable：同總量保留第一次出現的順序
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals.truncate(TOP_DESTINATIONS);

    ScenarioStats {
        min_count: flows.iter().map(|f| f.count()).min(),
        max_count: flows.iter().map(|f| f.count()).max(),
        top_destinations: totals,
    }
}
