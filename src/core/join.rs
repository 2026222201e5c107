use serde::Serialize;

use crate::domain::model::{AreaLookup, FlowRecord, JoinedFlow};
use crate::utils::error::{FlowError, Result};

/// 合併時被丟棄的原因（逐列處理，不是錯誤）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingCentroid,
    SelfLoopExcluded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub input_flows: usize,
    pub missing_centroid: usize,
    pub self_loops: usize,
    pub joined_flows: usize,
}

impl JoinReport {
    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingCentroid => self.missing_centroid += 1,
            DropReason::SelfLoopExcluded => self.self_loops += 1,
        }
    }
}

/// Flows joined against area centroids. Immutable once built; order is the
/// order of the input flow table.
#[derive(Debug, Clone)]
pub struct JoinedFlowStore {
    flows: Vec<JoinedFlow>,
    areas: AreaLookup,
    report: JoinReport,
}

impl JoinedFlowStore {
    pub fn build(flows: Vec<FlowRecord>, lookup: AreaLookup) -> Result<Self> {
        if flows.is_empty() {
            return Err(FlowError::missing_input("flow table", "no flow records"));
        }
        if lookup.is_empty() {
            return Err(FlowError::missing_input("area lookup", "no area records"));
        }

        let mut report = JoinReport {
            input_flows: flows.len(),
            ..JoinReport::default()
        };
        let mut joined = Vec::with_capacity(flows.len());

        for flow in flows {
            match join_one(flow, &lookup) {
                Ok(flow) => joined.push(flow),
                Err(reason) => report.record_drop(reason),
            }
        }
        report.joined_flows = joined.len();

        tracing::info!(
            "⚙️ Joined {} flows: {} dropped without centroid, {} self-loops excluded",
            report.joined_flows,
            report.missing_centroid,
            report.self_loops
        );
        if report.joined_flows == 0 {
            tracing::warn!("⚠️ No flow survived the centroid join; outputs will be empty");
        }

        Ok(Self {
            flows: joined,
            areas: lookup,
            report,
        })
    }

    pub fn flows(&self) -> &[JoinedFlow] {
        &self.flows
    }

    pub fn areas(&self) -> &AreaLookup {
        &self.areas
    }

    pub fn report(&self) -> JoinReport {
        self.report
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

fn join_one(flow: FlowRecord, lookup: &AreaLookup) -> std::result::Result<JoinedFlow, DropReason> {
    let origin_coord = lookup
        .centroid(&flow.origin_code)
        .ok_or(DropReason::MissingCentroid)?;
    let dest_coord = lookup
        .centroid(&flow.dest_code)
        .ok_or(DropReason::MissingCentroid)?;

    // 起訖同一點畫不出線段
    if origin_coord == dest_coord {
        return Err(DropReason::SelfLoopExcluded);
    }

    Ok(JoinedFlow {
        flow,
        origin_coord,
        dest_coord,
    })
}

/// 依流量遞減排序；stable sort，同值保留原本順序
pub fn rank_by_count(flows: &mut [&JoinedFlow]) {
    flows.sort_by(|a, b| b.count().cmp(&a.count()));
}
