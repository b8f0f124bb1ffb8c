use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Notice type codes accepted by the v2 search endpoint (`ptype` parameter).
pub const NOTICE_TYPES: &[(&str, &str)] = &[
    ("o", "Solicitation"),
    ("p", "Presolicitation"),
    ("k", "Combined Synopsis/Solicitation"),
    ("r", "Sources Sought"),
    ("s", "Special Notice"),
    ("a", "Award Notice"),
    ("u", "Justification and Authorization"),
    ("g", "Sale of Surplus Property"),
    ("i", "Intent to Bundle Requirements"),
];

pub fn notice_type_label(code: &str) -> Option<&'static str> {
    NOTICE_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// One opportunity record as returned by the SAM.gov Opportunities API (v2).
/// Every field is optional; the API omits fields freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub notice_id: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub sub_tier: Option<String>,
    pub office: Option<String>,
    pub posted_date: Option<String>,
    // The API spells this with a capital L.
    #[serde(rename = "responseDeadLine")]
    pub response_deadline: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
    pub type_of_set_aside: Option<String>,
    pub naics_code: Option<String>,
    pub classification_code: Option<String>,
    pub active: Option<String>,
    pub description: Option<String>,
}

/// Response envelope of the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub opportunities_data: Vec<Opportunity>,
}

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Filter parameters for one search. Dates are MM/DD/YYYY as the API expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub naics_code: Option<String>,
    pub set_aside: Option<String>,
    pub notice_type: Option<String>,
    pub posted_from: String,
    pub posted_to: String,
}

impl SearchQuery {
    pub fn posted_between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            posted_from: from.format(DATE_FORMAT).to_string(),
            posted_to: to.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Window of the last `days_back` days ending today.
    pub fn last_days(days_back: i64) -> Self {
        let today = Local::now().date_naive();
        Self::posted_between(today - Duration::days(days_back), today)
    }

    /// Filename slug for this search: keyword, else NAICS code, else "all".
    pub fn tag(&self) -> String {
        self.keyword
            .as_deref()
            .or(self.naics_code.as_deref())
            .unwrap_or("all")
            .to_lowercase()
            .replace(' ', "_")
    }
}

pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Flat CSV row. Field order here is the column order of the output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub notice_id: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub sub_tier: Option<String>,
    pub office: Option<String>,
    pub posted_date: Option<String>,
    pub response_deadline: Option<String>,
    pub notice_type: Option<String>,
    pub set_aside: Option<String>,
    pub naics_code: Option<String>,
    pub classification_code: Option<String>,
    pub active: Option<String>,
    pub description: Option<String>,
    pub link: String,
}

impl OpportunityRow {
    pub fn from_opportunity(opp: &Opportunity) -> Self {
        let link = opp
            .notice_id
            .as_deref()
            .map(|id| format!("https://sam.gov/opp/{}/view", id))
            .unwrap_or_default();

        Self {
            notice_id: opp.notice_id.clone(),
            title: opp.title.clone(),
            department: opp.department.clone(),
            sub_tier: opp.sub_tier.clone(),
            office: opp.office.clone(),
            posted_date: opp.posted_date.clone(),
            response_deadline: opp.response_deadline.clone(),
            notice_type: opp.notice_type.clone(),
            set_aside: opp.type_of_set_aside.clone(),
            naics_code: opp.naics_code.clone(),
            classification_code: opp.classification_code.clone(),
            active: opp.active.clone(),
            description: opp.description.as_deref().map(truncate_description),
            link,
        }
    }
}

// Counted in chars so multi-byte text never splits a character.
fn truncate_description(text: &str) -> String {
    text.chars().take(DESCRIPTION_MAX_CHARS).collect()
}

/// Output of the transform stage.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub rows: Vec<OpportunityRow>,
    pub csv_output: String,
    pub tsv_output: String,
    pub duplicates_dropped: usize,
}
