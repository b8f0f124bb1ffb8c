use crate::core::client::DEFAULT_ENDPOINT;
use crate::domain::model::SearchQuery;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DAYS_BACK: i64 = 30;
pub const DEFAULT_MAX_RESULTS: usize = 500;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;
pub const DEFAULT_COMBINED_STEM: &str = "sam_combined";

/// A search plan: one API section, several searches, one output section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub plan: PlanInfo,
    pub api: ApiConfig,
    pub searches: Vec<SearchSpec>,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub page_size: Option<usize>,
    pub page_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSpec {
    pub label: String,
    pub enabled: Option<bool>,
    pub keyword: Option<String>,
    pub naics_code: Option<String>,
    pub set_aside: Option<String>,
    pub notice_type: Option<String>,
    pub days_back: Option<i64>,
    pub posted_from: Option<String>,
    pub posted_to: Option<String>,
    pub max_results: Option<usize>,
}

impl SearchSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn record_limit(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }

    /// Build the API query for this search. Explicit dates override the
    /// trailing-days window.
    pub fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::last_days(self.days_back.unwrap_or(DEFAULT_DAYS_BACK));
        if let Some(from) = &self.posted_from {
            query.posted_from = from.clone();
        }
        if let Some(to) = &self.posted_to {
            query.posted_to = to.clone();
        }
        query.keyword = self.keyword.clone();
        query.naics_code = self.naics_code.clone();
        query.set_aside = self.set_aside.clone();
        query.notice_type = self.notice_type.clone();
        query
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub combined_stem: Option<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// "stop" (default) or "continue".
    pub on_search_failure: Option<String>,
}

impl PlanConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` with the environment value; unknown variables
    /// are left in place so validation can flag them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn endpoint(&self) -> &str {
        self.api.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn api_key(&self) -> &str {
        self.api.api_key.as_deref().unwrap_or("")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds.unwrap_or(30)
    }

    pub fn retry_attempts(&self) -> u32 {
        self.api.retry_attempts.unwrap_or(0)
    }

    pub fn retry_delay_seconds(&self) -> u64 {
        self.api.retry_delay_seconds.unwrap_or(5)
    }

    pub fn page_size(&self) -> usize {
        self.api.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn page_delay_ms(&self) -> u64 {
        self.api.page_delay_ms.unwrap_or(DEFAULT_PAGE_DELAY_MS)
    }

    pub fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    pub fn combined_stem(&self) -> &str {
        self.output
            .combined_stem
            .as_deref()
            .unwrap_or(DEFAULT_COMBINED_STEM)
    }

    pub fn compression_enabled(&self) -> bool {
        self.output
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn stop_on_failure(&self) -> bool {
        self.error_handling
            .as_ref()
            .and_then(|eh| eh.on_search_failure.as_deref())
            != Some("continue")
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.endpoint", self.endpoint())?;
        validation::validate_path("output.path", &self.output.path)?;

        let api_key = self.api_key();
        validation::validate_non_empty_string("api.api_key", api_key)?;
        if api_key.starts_with("${") {
            return Err(EtlError::InvalidConfigValueError {
                field: "api.api_key".to_string(),
                value: api_key.to_string(),
                reason: "Environment variable was not substituted; is it set?".to_string(),
            });
        }

        validation::validate_range("api.page_size", self.page_size(), 1, 1000)?;

        if let Some(eh) = &self.error_handling {
            if let Some(policy) = eh.on_search_failure.as_deref() {
                if policy != "stop" && policy != "continue" {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "error_handling.on_search_failure".to_string(),
                        value: policy.to_string(),
                        reason: "Expected 'stop' or 'continue'".to_string(),
                    });
                }
            }
        }

        let valid_formats = ["csv", "tsv"];
        if self.output.formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "output.formats".to_string(),
            });
        }
        for format in &self.output.formats {
            if !valid_formats.contains(&format.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        if self.searches.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "searches".to_string(),
            });
        }

        for (index, search) in self.searches.iter().enumerate() {
            let field = |name: &str| format!("searches[{}].{}", index, name);

            validation::validate_non_empty_string(&field("label"), &search.label)?;
            validation::validate_positive_number(&field("max_results"), search.record_limit(), 1)?;

            if let Some(days_back) = search.days_back {
                validation::validate_range(&field("days_back"), days_back, 1, 365)?;
            }
            if let Some(naics) = &search.naics_code {
                validation::validate_naics_code(&field("naics_code"), naics)?;
            }
            if let Some(notice_type) = &search.notice_type {
                validation::validate_notice_type(&field("notice_type"), notice_type)?;
            }
            match (&search.posted_from, &search.posted_to) {
                (Some(from), Some(to)) => {
                    validation::validate_date_window(
                        &field("posted_from"),
                        from,
                        &field("posted_to"),
                        to,
                    )?;
                }
                (Some(from), None) => {
                    validation::validate_date(&field("posted_from"), from)?;
                }
                (None, Some(to)) => {
                    validation::validate_date(&field("posted_to"), to)?;
                }
                (None, None) => {}
            }
        }

        Ok(())
    }
}

impl Validate for PlanConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_plan(api_key_line: &str) -> String {
        format!(
            r#"
[plan]
name = "test-plan"
description = "Test plan"
version = "1.0.0"

[api]
{}

[[searches]]
label = "Engineering Services"
keyword = "engineering services"
naics_code = "541330"
days_back = 30
max_results = 100

[output]
path = "./test-output"
formats = ["csv"]
"#,
            api_key_line
        )
    }

    #[test]
    fn test_parse_basic_plan() {
        let config =
            PlanConfig::from_toml_str(&minimal_plan(r#"api_key = "abc123""#)).unwrap();

        assert_eq!(config.plan.name, "test-plan");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.searches.len(), 1);
        assert_eq!(config.searches[0].keyword.as_deref(), Some("engineering services"));
        assert!(config.stop_on_failure());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PLAN_TEST_KEY_A1", "secret-from-env");

        let config =
            PlanConfig::from_toml_str(&minimal_plan(r#"api_key = "${PLAN_TEST_KEY_A1}""#))
                .unwrap();
        assert_eq!(config.api_key(), "secret-from-env");

        std::env::remove_var("PLAN_TEST_KEY_A1");
    }

    #[test]
    fn test_unsubstituted_api_key_fails_validation() {
        std::env::remove_var("PLAN_TEST_KEY_UNSET_B2");

        let config =
            PlanConfig::from_toml_str(&minimal_plan(r#"api_key = "${PLAN_TEST_KEY_UNSET_B2}""#))
                .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let config = PlanConfig::from_toml_str(&minimal_plan("")).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_output_format_rejected() {
        let toml = minimal_plan(r#"api_key = "k""#).replace("[\"csv\"]", "[\"xlsx\"]");
        let config = PlanConfig::from_toml_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_notice_type_rejected() {
        let toml = minimal_plan(r#"api_key = "k""#)
            .replace("naics_code = \"541330\"", "notice_type = \"q\"");
        let config = PlanConfig::from_toml_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_query_uses_explicit_dates() {
        let spec = SearchSpec {
            label: "Aerospace".to_string(),
            enabled: None,
            keyword: Some("aerospace".to_string()),
            naics_code: None,
            set_aside: None,
            notice_type: None,
            days_back: None,
            posted_from: Some("01/01/2025".to_string()),
            posted_to: Some("02/01/2025".to_string()),
            max_results: None,
        };

        let query = spec.query();
        assert_eq!(query.posted_from, "01/01/2025");
        assert_eq!(query.posted_to, "02/01/2025");
        assert_eq!(query.keyword.as_deref(), Some("aerospace"));
    }

    #[test]
    fn test_disabled_and_default_enabled() {
        let toml = minimal_plan(r#"api_key = "k""#).replace(
            "label = \"Engineering Services\"",
            "label = \"Engineering Services\"\nenabled = false",
        );
        let config = PlanConfig::from_toml_str(&toml).unwrap();
        assert!(!config.searches[0].is_enabled());

        let config = PlanConfig::from_toml_str(&minimal_plan(r#"api_key = "k""#)).unwrap();
        assert!(config.searches[0].is_enabled());
    }

    #[test]
    fn test_continue_on_failure_policy() {
        let mut toml = minimal_plan(r#"api_key = "k""#);
        toml.push_str("\n[error_handling]\non_search_failure = \"continue\"\n");

        let config = PlanConfig::from_toml_str(&toml).unwrap();
        assert!(!config.stop_on_failure());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(minimal_plan(r#"api_key = "abc""#).as_bytes())
            .unwrap();

        let config = PlanConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.plan.name, "test-plan");
    }
}
