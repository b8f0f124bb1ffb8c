use crate::domain::model::{Opportunity, SearchQuery, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn output_path(&self) -> &str;
    fn page_size(&self) -> usize;
    fn max_results(&self) -> usize;
    fn page_delay_ms(&self) -> u64;
    fn search_query(&self) -> SearchQuery;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Opportunity>>;
    async fn transform(&self, data: Vec<Opportunity>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
