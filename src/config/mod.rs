pub mod cli;
pub mod plan_config;

#[cfg(feature = "cli")]
use crate::core::client::{DEFAULT_ENDPOINT, MAX_PAGE_SIZE};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::SearchQuery;
#[cfg(feature = "cli")]
use crate::utils::error::{EtlError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "sam-etl")]
#[command(about = "Search SAM.gov contract opportunities and export them to CSV")]
pub struct CliConfig {
    /// Search term, e.g. "cybersecurity" or "IT services"
    #[arg(long)]
    pub keyword: Option<String>,

    /// NAICS code filter, e.g. 541512 for computer systems design
    #[arg(long)]
    pub naics: Option<String>,

    /// Set-aside type, e.g. SBA, 8a, HUBZone, SDVOSBC, WOSB
    #[arg(long)]
    pub set_aside: Option<String>,

    /// Notice type code (o solicitation, p presolicitation, k combined
    /// synopsis, r sources sought, s special notice, ...)
    #[arg(long)]
    pub notice_type: Option<String>,

    /// Search postings from the last N days
    #[arg(long, default_value = "30")]
    pub days_back: i64,

    /// Start date MM/DD/YYYY (overrides --days-back)
    #[arg(long)]
    pub posted_from: Option<String>,

    /// End date MM/DD/YYYY (defaults to today)
    #[arg(long)]
    pub posted_to: Option<String>,

    #[arg(long, default_value = "500")]
    pub max_results: usize,

    /// Results per page; the API caps this at 1000
    #[arg(long, default_value = "100")]
    pub page_size: usize,

    /// Pause between page requests, in milliseconds
    #[arg(long, default_value = "1000")]
    pub page_delay_ms: u64,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// API key; defaults to the SAM_API_KEY environment variable
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Fill the API key from SAM_API_KEY when no flag was given.
    pub fn resolve_api_key(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("SAM_API_KEY").ok();
        }
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    fn page_delay_ms(&self) -> u64 {
        self.page_delay_ms
    }

    fn search_query(&self) -> SearchQuery {
        let mut query = SearchQuery::last_days(self.days_back);
        if let Some(from) = &self.posted_from {
            query.posted_from = from.clone();
        }
        if let Some(to) = &self.posted_to {
            query.posted_to = to.clone();
        }
        query.keyword = self.keyword.clone();
        query.naics_code = self.naics.clone();
        query.set_aside = self.set_aside.clone();
        query.notice_type = self.notice_type.clone();
        query
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_path("output_path", &self.output_path)?;

        if self.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(EtlError::MissingApiKey);
        }

        validation::validate_range("page_size", self.page_size, 1, MAX_PAGE_SIZE)?;
        validation::validate_positive_number("max_results", self.max_results, 1)?;
        validation::validate_range("days_back", self.days_back, 1, 365)?;

        if let Some(naics) = &self.naics {
            validation::validate_naics_code("naics", naics)?;
        }
        if let Some(notice_type) = &self.notice_type {
            validation::validate_notice_type("notice_type", notice_type)?;
        }
        match (&self.posted_from, &self.posted_to) {
            (Some(from), Some(to)) => {
                validation::validate_date_window("posted_from", from, "posted_to", to)?;
            }
            (Some(from), None) => {
                validation::validate_date("posted_from", from)?;
            }
            (None, Some(to)) => {
                validation::validate_date("posted_to", to)?;
            }
            (None, None) => {}
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn parsed(args: &[&str]) -> CliConfig {
        let mut full = vec!["sam-etl"];
        full.extend_from_slice(args);
        CliConfig::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parsed(&[]);
        assert_eq!(config.days_back, 30);
        assert_eq!(config.max_results, 500);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.api_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.output_path, "./output");
        assert!(config.keyword.is_none());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = parsed(&[]);
        assert!(matches!(
            config.validate().unwrap_err(),
            EtlError::MissingApiKey
        ));

        let config = parsed(&["--api-key", "abc123"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_filters() {
        let config = parsed(&["--api-key", "k", "--naics", "54abc"]);
        assert!(config.validate().is_err());

        let config = parsed(&["--api-key", "k", "--notice-type", "zz"]);
        assert!(config.validate().is_err());

        let config = parsed(&["--api-key", "k", "--page-size", "2000"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_query_from_flags() {
        let config = parsed(&[
            "--keyword",
            "engineering",
            "--set-aside",
            "SBA",
            "--posted-from",
            "01/01/2025",
            "--posted-to",
            "02/01/2025",
        ]);

        let query = config.search_query();
        assert_eq!(query.keyword.as_deref(), Some("engineering"));
        assert_eq!(query.set_aside.as_deref(), Some("SBA"));
        assert_eq!(query.posted_from, "01/01/2025");
        assert_eq!(query.posted_to, "02/01/2025");
    }
}
