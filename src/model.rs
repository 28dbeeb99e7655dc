use serde::{Deserialize, Serialize};

/// One compliance report entry as extracted from the portal results table.
///
/// `rd_id` is the stable natural key (a report-definition URL path segment)
/// and the sole identity used for deduplication and PDF matching. The
/// scraping collaborator may omit fields; absent keys deserialize to the
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(default)]
    pub rd_id: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub report_type: String,
    #[serde(default)]
    pub report_definition: String,
    #[serde(default)]
    pub report_definition_url: String,
    #[serde(default)]
    pub site_tags: String,
    #[serde(default)]
    pub publishing_user: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

/// Persisted projection of a report: the scraped fields plus the ledger's
/// own bookkeeping columns.
#[derive(Debug, Clone, Serialize)]
pub struct StoredReport {
    #[serde(flatten)]
    pub record: ReportRecord,
    pub created_at: String,
    pub pdf_downloaded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub total_reports: i64,
    pub pdfs_downloaded: i64,
    /// Per-date report counts, capped at the 10 most recent distinct dates.
    pub recent_dates: Vec<DateCount>,
}
