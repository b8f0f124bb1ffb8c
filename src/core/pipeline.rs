use crate::core::client::SamClient;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Opportunity, OpportunityRow, TransformResult};
use crate::utils::error::{EtlError, Result};
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::time::Duration;

/// Column order of the output files; must match `OpportunityRow`'s fields.
const CSV_HEADERS: [&str; 14] = [
    "notice_id",
    "title",
    "department",
    "sub_tier",
    "office",
    "posted_date",
    "response_deadline",
    "notice_type",
    "set_aside",
    "naics_code",
    "classification_code",
    "active",
    "description",
    "link",
];

pub fn rows_from(opportunities: &[Opportunity]) -> Vec<OpportunityRow> {
    opportunities
        .iter()
        .map(OpportunityRow::from_opportunity)
        .collect()
}

/// Drop rows whose notice id was already seen. Rows without a notice id are
/// never treated as duplicates of one another.
pub fn dedupe_rows(rows: Vec<OpportunityRow>) -> (Vec<OpportunityRow>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for row in rows {
        match &row.notice_id {
            Some(id) if !seen.insert(id.clone()) => dropped += 1,
            _ => unique.push(row),
        }
    }

    (unique, dropped)
}

pub fn write_csv(rows: &[OpportunityRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_rows(&mut writer, rows)?;
    finish_writer(writer)
}

pub fn write_tsv(rows: &[OpportunityRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    write_rows(&mut writer, rows)?;
    finish_writer(writer)
}

fn write_rows(writer: &mut csv::Writer<Vec<u8>>, rows: &[OpportunityRow]) -> Result<()> {
    if rows.is_empty() {
        // serialize() emits headers from the first row; an empty result set
        // still gets a header line.
        writer.write_record(CSV_HEADERS)?;
        return Ok(());
    }
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(())
}

fn finish_writer(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("CSV writer flush failed: {}", e),
        })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

pub fn output_filename(stem: &str, timestamp: NaiveDateTime, extension: &str) -> String {
    format!("{}_{}.{}", stem, timestamp.format("%Y%m%d_%H%M%S"), extension)
}

/// One search from filter parameters to a timestamped CSV on disk.
pub struct SearchPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: SamClient,
}

impl<S: Storage, C: ConfigProvider> SearchPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let client = SamClient::new(config.api_endpoint(), config.api_key())
            .with_page_delay(Duration::from_millis(config.page_delay_ms()));
        Self {
            storage,
            config,
            client,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SearchPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Opportunity>> {
        let query = self.config.search_query();
        tracing::info!(
            "🔎 Searching SAM.gov: keyword={:?}, naics={:?}, set_aside={:?}, type={:?}, posted {} - {}",
            query.keyword,
            query.naics_code,
            query.set_aside,
            query.notice_type,
            query.posted_from,
            query.posted_to
        );

        self.client
            .fetch_all(&query, self.config.page_size(), self.config.max_results())
            .await
    }

    async fn transform(&self, data: Vec<Opportunity>) -> Result<TransformResult> {
        let (rows, duplicates_dropped) = dedupe_rows(rows_from(&data));
        if duplicates_dropped > 0 {
            tracing::debug!("Dropped {} duplicate notice ids", duplicates_dropped);
        }

        let csv_output = write_csv(&rows)?;
        let tsv_output = write_tsv(&rows)?;

        Ok(TransformResult {
            rows,
            csv_output,
            tsv_output,
            duplicates_dropped,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let stem = format!("sam_opportunities_{}", self.config.search_query().tag());
        let filename = output_filename(&stem, Local::now().naive_local(), "csv");

        self.storage
            .write_file(&filename, result.csv_output.as_bytes())
            .await?;

        Ok(format!("{}/{}", self.config.output_path(), filename))
    }
}
