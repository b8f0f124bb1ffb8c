use crate::domain::model::{Opportunity, SearchQuery, SearchResponse};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;

/// Production v2 search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.sam.gov/prod/opportunities/v2/search";

/// Hard cap imposed by the API on the `limit` parameter.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Client for the SAM.gov Opportunities API.
pub struct SamClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
    page_delay: Duration,
}

impl SamClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            retry_attempts: 0,
            retry_delay: Duration::from_secs(5),
            page_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Courtesy pause between page requests.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Fetch a single page of results, retrying throttled and transport-level
    /// failures up to the configured attempt count.
    pub async fn fetch_page(
        &self,
        query: &SearchQuery,
        limit: usize,
        offset: usize,
    ) -> Result<SearchResponse> {
        let mut attempt = 0;
        loop {
            match self.request_page(query, limit, offset).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry_attempts && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        "⚠️ Page request failed ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.retry_attempts,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_page(
        &self,
        query: &SearchQuery,
        limit: usize,
        offset: usize,
    ) -> Result<SearchResponse> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("postedFrom", query.posted_from.clone()),
            ("postedTo", query.posted_to.clone()),
        ];

        if let Some(keyword) = &query.keyword {
            params.push(("keyword", keyword.clone()));
        }
        if let Some(naics) = &query.naics_code {
            params.push(("ncode", naics.clone()));
        }
        if let Some(set_aside) = &query.set_aside {
            params.push(("typeOfSetAside", set_aside.clone()));
        }
        if let Some(notice_type) = &query.notice_type {
            params.push(("ptype", notice_type.clone()));
        }

        tracing::debug!("GET {} (limit={}, offset={})", self.endpoint, limit, offset);

        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::ApiStatusError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response.json::<SearchResponse>().await?)
    }

    /// Paginate through all matching records, stopping at an empty page, at
    /// `max_results` collected records, or at the server-reported total.
    pub async fn fetch_all(
        &self,
        query: &SearchQuery,
        page_size: usize,
        max_results: usize,
    ) -> Result<Vec<Opportunity>> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut collected: Vec<Opportunity> = Vec::new();
        let mut offset = 0;

        loop {
            let limit = page_size.min(max_results - collected.len());
            let page = self.fetch_page(query, limit, offset).await?;
            let total = page.total_records;

            if page.opportunities_data.is_empty() {
                break;
            }

            offset += page.opportunities_data.len();
            collected.extend(page.opportunities_data);
            tracing::info!(
                "  Fetched {}/{} opportunities...",
                collected.len(),
                total.min(max_results)
            );

            if collected.len() >= max_results || offset >= total {
                break;
            }

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        collected.truncate(max_results);
        Ok(collected)
    }
}

fn is_retryable(error: &EtlError) -> bool {
    match error {
        EtlError::ApiError(e) => e.is_timeout() || e.is_connect(),
        EtlError::ApiStatusError { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}
