use crate::core::geojson::{BinAnnotation, FeatureCollection};
use crate::core::join::{rank_by_count, JoinedFlowStore};
use crate::domain::model::{Direction, JoinedFlow};
use crate::utils::error::{FlowError, Result};

pub const DEFAULT_LIMIT: usize = 1000;

/// 單一區域查詢，供 API 使用；只讀取 store，可並行呼叫
#[derive(Debug, Clone, Copy)]
pub struct FlowQueryEngine<'a> {
    store: &'a JoinedFlowStore,
}

impl<'a> FlowQueryEngine<'a> {
    pub fn new(store: &'a JoinedFlowStore) -> Self {
        Self { store }
    }

    /// Top `limit` flows touching `area_code`, largest count first. Ties keep
    /// store order. An unknown area yields an empty result.
    pub fn query(
        &self,
        area_code: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<&'a JoinedFlow>> {
        if limit == 0 {
            return Err(FlowError::invalid_argument("limit", "must be a positive integer"));
        }

        let mut selected: Vec<&JoinedFlow> = self
            .store
            .flows()
            .iter()
            .filter(|joined| direction.touches(&joined.flow, area_code))
            .collect();
        rank_by_count(&mut selected);
        selected.truncate(limit);

        tracing::debug!(
            "🔍 Query {} {} limit {} -> {} flows",
            area_code,
            direction,
            limit,
            selected.len()
        );
        Ok(selected)
    }

    pub fn query_geojson(
        &self,
        area_code: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<FeatureCollection> {
        let flows = self.query(area_code, direction, limit)?;
        Ok(FeatureCollection::from_flows(
            None,
            flows,
            BinAnnotation::None,
        ))
    }
}

/// 解析查詢字串中的 limit；缺少時使用預設值
pub fn parse_limit(raw: Option<&str>, default_limit: usize) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(default_limit);
    };

    let value: i64 = raw.trim().parse().map_err(|_| {
        FlowError::invalid_argument("limit", format!("'{}' is not an integer", raw))
    })?;
    if value <= 0 {
        return Err(FlowError::invalid_argument(
            "limit",
            format!("must be a positive integer, got {}", value),
        ));
    }
    usize::try_from(value)
        .map_err(|_| FlowError::invalid_argument("limit", format!("{} is too large", value)))
}

pub fn parse_direction(raw: Option<&str>) -> Result<Direction> {
    raw.map_or(Ok(Direction::default()), str::parse)
}
