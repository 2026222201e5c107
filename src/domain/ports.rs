use crate::core::scenario::ScenarioSpec;
use crate::domain::model::{AreaRecord, FlowRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn flows_path(&self) -> &str;
    fn lookup_path(&self) -> &str;
    fn processed_dir(&self) -> &str;
    fn scenarios(&self) -> &[ScenarioSpec];
}

/// 流量表與區域查表的來源（目前為 CSV，之後可換成欄式格式）
#[async_trait]
pub trait FlowSource: Send + Sync {
    async fn load_areas(&self) -> Result<Vec<AreaRecord>>;
    async fn load_flows(&self) -> Result<Vec<FlowRecord>>;
}
