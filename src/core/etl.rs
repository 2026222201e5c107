use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::export::{ScenarioExportPipeline, ScenarioStats};
use crate::core::join::{JoinReport, JoinedFlowStore};
use crate::core::scenario::ScenarioSpec;
use crate::domain::model::AreaLookup;
use crate::domain::ports::{FlowSource, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub const MANIFEST_FILE: &str = "manifest.json";

/// 載入兩張表並合併；serve 與 export 都走這裡，完成前不接受任何請求
pub async fn load_store<F: FlowSource + ?Sized>(source: &F) -> Result<JoinedFlowStore> {
    let areas = source.load_areas().await?;
    tracing::info!("📍 Loaded {} area centroids", areas.len());
    let lookup = AreaLookup::from_records(areas)?;

    let flows = source.load_flows().await?;
    tracing::info!("📥 Loaded {} flow records", flows.len());

    JoinedFlowStore::build(flows, lookup)
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub file: String,
    pub feature_count: usize,
    pub size_bytes: usize,
    pub stats: ScenarioStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub generated_at: DateTime<Utc>,
    pub join: JoinReport,
    pub artifacts: Vec<ArtifactEntry>,
    pub failures: Vec<ScenarioFailure>,
}

impl ExportSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ExportEngine<F: FlowSource, S: Storage> {
    source: F,
    storage: S,
    scenarios: Vec<ScenarioSpec>,
    monitor: SystemMonitor,
}

impl<F: FlowSource, S: Storage> ExportEngine<F, S> {
    pub fn new(source: F, storage: S, scenarios: Vec<ScenarioSpec>) -> Self {
        Self::new_with_monitoring(source, storage, scenarios, false)
    }

    pub fn new_with_monitoring(
        source: F,
        storage: S,
        scenarios: Vec<ScenarioSpec>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            source,
            storage,
            scenarios,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<ExportSummary> {
        tracing::info!("🚀 Starting scenario export ({} scenarios)", self.scenarios.len());

        let store = load_store(&self.source).await?;
        self.monitor.log_stats("Load & join");

        let results = ScenarioExportPipeline::new(&store).run(&self.scenarios);
        self.monitor.log_stats("Export");

        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        for (spec, result) in self.scenarios.iter().zip(results) {
            match result {
                Ok(result) => {
                    let file = result.file_name();
                    self.storage.write_file(&file, result.output.as_bytes()).await?;
                    tracing::info!(
                        "💾 {}: {} features, {:.2} MB",
                        file,
                        result.feature_count,
                        result.output.len() as f64 / (1024.0 * 1024.0)
                    );
                    artifacts.push(ArtifactEntry {
                        name: result.name,
                        file,
                        feature_count: result.feature_count,
                        size_bytes: result.output.len(),
                        stats: result.stats,
                    });
                }
                Err(e) => {
                    tracing::error!("❌ Scenario {} skipped: {}", spec.name, e);
                    failures.push(ScenarioFailure {
                        name: spec.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = ExportSummary {
            generated_at: Utc::now(),
            join: store.report(),
            artifacts,
            failures,
        };
        let manifest = serde_json::to_vec_pretty(&summary)?;
        self.storage.write_file(MANIFEST_FILE, &manifest).await?;
        self.monitor.log_stats("Write");
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
