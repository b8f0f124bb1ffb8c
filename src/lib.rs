pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::cli::LocalStorage;

pub use crate::core::{client::SamClient, etl::EtlEngine, pipeline::SearchPipeline, plan::PlanRunner};
pub use domain::model::{Opportunity, OpportunityRow, SearchQuery, SearchResponse};
pub use utils::error::{EtlError, Result};
