use crate::config::plan_config::{PlanConfig, SearchSpec};
use crate::core::client::SamClient;
use crate::core::pipeline::{dedupe_rows, output_filename, rows_from, write_csv, write_tsv};
use crate::core::Storage;
use crate::domain::model::OpportunityRow;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;
use zip::write::{FileOptions, ZipWriter};

/// Result of one search within a plan run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub label: String,
    pub fetched: usize,
    pub rows_written: usize,
    pub duplicates_dropped: usize,
    pub files: Vec<String>,
    pub error: Option<String>,
}

/// Summary of a full plan run.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub outcomes: Vec<SearchOutcome>,
    pub combined_rows: usize,
    pub combined_duplicates_dropped: usize,
    pub combined_file: Option<String>,
    pub archive_file: Option<String>,
}

/// Executes every enabled search of a plan in order, then writes a combined,
/// deduplicated export.
pub struct PlanRunner<S: Storage> {
    storage: S,
    config: PlanConfig,
    client: SamClient,
    monitor: SystemMonitor,
}

impl<S: Storage> PlanRunner<S> {
    pub fn new(storage: S, config: PlanConfig) -> Self {
        Self::new_with_monitoring(storage, config, false)
    }

    pub fn new_with_monitoring(storage: S, config: PlanConfig, monitor_enabled: bool) -> Self {
        let client = SamClient::new(config.endpoint(), config.api_key())
            .with_timeout(Duration::from_secs(config.timeout_seconds()))
            .with_retry(
                config.retry_attempts(),
                Duration::from_secs(config.retry_delay_seconds()),
            )
            .with_page_delay(Duration::from_millis(config.page_delay_ms()));

        Self {
            storage,
            config,
            client,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn execute_all(&self) -> Result<PlanReport> {
        let run_stamp = Local::now().naive_local();
        let stop_on_failure = self.config.stop_on_failure();
        let mut outcomes = Vec::new();
        let mut combined: Vec<OpportunityRow> = Vec::new();
        let mut bundle: Vec<(String, Vec<u8>)> = Vec::new();
        let mut used_stems: HashSet<String> = HashSet::new();

        for search in &self.config.searches {
            if !search.is_enabled() {
                tracing::info!("⏭️ Skipping disabled search '{}'", search.label);
                continue;
            }

            tracing::info!("🔎 {}", search.label);

            match self
                .run_search(search, run_stamp, &mut used_stems, &mut bundle)
                .await
            {
                Ok((outcome, rows)) => {
                    self.monitor.log_stats(&search.label);
                    combined.extend(rows);
                    outcomes.push(outcome);
                }
                Err(e) if !stop_on_failure => {
                    tracing::error!("❌ Search '{}' failed: {}", search.label, e);
                    tracing::error!("💡 {}", e.recovery_suggestion());
                    outcomes.push(SearchOutcome {
                        label: search.label.clone(),
                        fetched: 0,
                        rows_written: 0,
                        duplicates_dropped: 0,
                        files: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let (combined_rows, combined_duplicates_dropped) = dedupe_rows(combined);
        let mut combined_file = None;

        if !combined_rows.is_empty() {
            let csv_output = write_csv(&combined_rows)?;
            let filename = output_filename(self.config.combined_stem(), run_stamp, "csv");
            self.storage
                .write_file(&filename, csv_output.as_bytes())
                .await?;
            if self.config.compression_enabled() {
                bundle.push((filename.clone(), csv_output.into_bytes()));
            }
            tracing::info!(
                "📁 Combined export: {} unique opportunities ({} cross-search duplicates dropped)",
                combined_rows.len(),
                combined_duplicates_dropped
            );
            combined_file = Some(filename);
        } else {
            tracing::warn!("No opportunities found by any search; skipping combined export");
        }

        let mut archive_file = None;
        if self.config.compression_enabled() && !bundle.is_empty() {
            let filename = self
                .config
                .output
                .compression
                .as_ref()
                .map(|c| c.filename.clone())
                .unwrap_or_else(|| "sam_outputs.zip".to_string());
            let archive = build_archive(&bundle)?;
            self.storage.write_file(&filename, &archive).await?;
            tracing::info!("📦 Bundled {} files into {}", bundle.len(), filename);
            archive_file = Some(filename);
        }

        self.monitor.log_final_stats();

        Ok(PlanReport {
            outcomes,
            combined_rows: combined_rows.len(),
            combined_duplicates_dropped,
            combined_file,
            archive_file,
        })
    }

    async fn run_search(
        &self,
        search: &SearchSpec,
        run_stamp: NaiveDateTime,
        used_stems: &mut HashSet<String>,
        bundle: &mut Vec<(String, Vec<u8>)>,
    ) -> Result<(SearchOutcome, Vec<OpportunityRow>)> {
        let query = search.query();
        let opportunities = self
            .client
            .fetch_all(&query, self.config.page_size(), search.record_limit())
            .await?;
        let fetched = opportunities.len();

        let (rows, duplicates_dropped) = dedupe_rows(rows_from(&opportunities));

        // Two searches can share a tag; suffix repeats so files do not
        // overwrite each other within one run.
        let stem = unique_stem(
            used_stems,
            format!("sam_opportunities_{}", query.tag()),
        );

        let mut files = Vec::new();
        for format in self.config.output_formats() {
            let (content, extension) = match format.as_str() {
                "tsv" => (write_tsv(&rows)?, "tsv"),
                _ => (write_csv(&rows)?, "csv"),
            };
            let filename = output_filename(&stem, run_stamp, extension);
            self.storage
                .write_file(&filename, content.as_bytes())
                .await?;
            if self.config.compression_enabled() {
                bundle.push((filename.clone(), content.into_bytes()));
            }
            files.push(filename);
        }

        tracing::info!(
            "  {} opportunities fetched, {} rows written",
            fetched,
            rows.len()
        );

        Ok((
            SearchOutcome {
                label: search.label.clone(),
                fetched,
                rows_written: rows.len(),
                duplicates_dropped,
                files,
                error: None,
            },
            rows,
        ))
    }
}

fn unique_stem(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn file_names(&self) -> Vec<String> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            names
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn two_search_plan(endpoint: &str, extra: &str) -> PlanConfig {
        let toml = format!(
            r#"
[plan]
name = "test-plan"
description = "Two searches"
version = "1.0.0"

[api]
endpoint = "{}"
api_key = "test-key"
page_delay_ms = 0

[[searches]]
label = "Alpha"
keyword = "alpha"
max_results = 100

[[searches]]
label = "Beta"
keyword = "beta"
max_results = 100

[output]
path = "./test-output"
formats = ["csv"]
{}
"#,
            endpoint, extra
        );
        PlanConfig::from_toml_str(&toml).unwrap()
    }

    fn mock_search<'a>(
        server: &'a MockServer,
        keyword: &str,
        notices: &[&str],
    ) -> httpmock::Mock<'a> {
        let data: Vec<serde_json::Value> = notices
            .iter()
            .map(|id| serde_json::json!({"noticeId": id, "title": "Listed work"}))
            .collect();
        server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("keyword", keyword.to_string());
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "totalRecords": data.len(),
                    "opportunitiesData": data
                }));
        })
    }

    #[tokio::test]
    async fn test_plan_runs_all_searches_and_dedupes_combined() {
        let server = MockServer::start();
        let alpha = mock_search(&server, "alpha", &["n1", "n2"]);
        let beta = mock_search(&server, "beta", &["n2", "n3"]);

        let storage = MockStorage::new();
        let runner = PlanRunner::new(storage.clone(), two_search_plan(&server.url("/search"), ""));
        let report = runner.execute_all().await.unwrap();

        alpha.assert();
        beta.assert();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].fetched, 2);
        assert_eq!(report.outcomes[1].fetched, 2);
        // n2 appears in both searches and survives only once.
        assert_eq!(report.combined_rows, 3);
        assert_eq!(report.combined_duplicates_dropped, 1);

        let names = storage.file_names().await;
        assert_eq!(names.len(), 3); // two per-search files plus the combined one

        let combined_name = report.combined_file.unwrap();
        assert!(combined_name.starts_with("sam_combined_"));
        let combined = String::from_utf8(storage.get_file(&combined_name).await.unwrap()).unwrap();
        assert_eq!(combined.matches("n2").count(), 2); // id column and link column, once each
        assert!(combined.contains("n1"));
        assert!(combined.contains("n3"));
    }

    #[tokio::test]
    async fn test_disabled_search_is_not_fetched() {
        let server = MockServer::start();
        let alpha = mock_search(&server, "alpha", &["n1"]);
        let beta = mock_search(&server, "beta", &["n2"]);

        let mut config = two_search_plan(&server.url("/search"), "");
        config.searches[1].enabled = Some(false);

        let runner = PlanRunner::new(MockStorage::new(), config);
        let report = runner.execute_all().await.unwrap();

        alpha.assert();
        assert_eq!(beta.hits(), 0);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.combined_rows, 1);
    }

    #[tokio::test]
    async fn test_failure_stops_run_by_default() {
        let server = MockServer::start();
        let alpha = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("keyword", "alpha");
            then.status(500);
        });
        let beta = mock_search(&server, "beta", &["n2"]);

        let runner = PlanRunner::new(
            MockStorage::new(),
            two_search_plan(&server.url("/search"), ""),
        );
        let err = runner.execute_all().await.unwrap_err();

        alpha.assert();
        assert_eq!(beta.hits(), 0);
        assert!(matches!(err, EtlError::ApiStatusError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_continue_on_failure_records_error_and_proceeds() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search").query_param("keyword", "alpha");
            then.status(500);
        });
        let beta = mock_search(&server, "beta", &["n2"]);

        let runner = PlanRunner::new(
            MockStorage::new(),
            two_search_plan(
                &server.url("/search"),
                "[error_handling]\non_search_failure = \"continue\"\n",
            ),
        );
        let report = runner.execute_all().await.unwrap();

        beta.assert();
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].error.is_some());
        assert!(report.outcomes[1].error.is_none());
        assert_eq!(report.combined_rows, 1);
    }

    #[tokio::test]
    async fn test_tsv_format_writes_both_files_per_search() {
        let server = MockServer::start();
        mock_search(&server, "alpha", &["n1"]);
        mock_search(&server, "beta", &["n2"]);

        let mut config = two_search_plan(&server.url("/search"), "");
        config.output.formats = vec!["csv".to_string(), "tsv".to_string()];

        let storage = MockStorage::new();
        let runner = PlanRunner::new(storage.clone(), config);
        let report = runner.execute_all().await.unwrap();

        assert_eq!(report.outcomes[0].files.len(), 2);
        // 2 searches x 2 formats + combined CSV
        assert_eq!(storage.file_names().await.len(), 5);
    }

    #[tokio::test]
    async fn test_archive_bundles_every_written_file() {
        let server = MockServer::start();
        mock_search(&server, "alpha", &["n1"]);
        mock_search(&server, "beta", &["n2"]);

        let storage = MockStorage::new();
        let runner = PlanRunner::new(
            storage.clone(),
            two_search_plan(
                &server.url("/search"),
                "[output.compression]\nenabled = true\nfilename = \"bundle.zip\"\n",
            ),
        );
        let report = runner.execute_all().await.unwrap();

        assert_eq!(report.archive_file.as_deref(), Some("bundle.zip"));

        let zip_bytes = storage.get_file("bundle.zip").await.unwrap();
        let cursor = std::io::Cursor::new(zip_bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.len(), 3);

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("sam_combined_")));
    }

    #[test]
    fn test_unique_stem_suffixes_repeats() {
        let mut used = HashSet::new();
        assert_eq!(
            unique_stem(&mut used, "sam_opportunities_cad".to_string()),
            "sam_opportunities_cad"
        );
        assert_eq!(
            unique_stem(&mut used, "sam_opportunities_cad".to_string()),
            "sam_opportunities_cad_2"
        );
        assert_eq!(
            unique_stem(&mut used, "sam_opportunities_cad".to_string()),
            "sam_opportunities_cad_3"
        );
    }
}
