pub mod client;
pub mod etl;
pub mod pipeline;
pub mod plan;

pub use crate::domain::model::{
    Opportunity, OpportunityRow, SearchQuery, SearchResponse, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
