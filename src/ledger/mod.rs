use std::path::PathBuf;

use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::model::{DateCount, LedgerStats, ReportRecord, StoredReport};

#[cfg(test)]
mod tests;

/// Durable record of every report ever seen, keyed by `rd_id`.
///
/// Holds only the database path; every operation opens its own scoped
/// connection and releases it before returning, so cross-process isolation
/// is deferred entirely to SQLite. The public methods never propagate
/// storage failures: reads degrade to empty/false/zero results and writes
/// log and report failure through their return value. The `try_*` variants
/// expose the underlying failure for callers and tests that need it. Only
/// `open` is fatal, since nothing works without a reachable database.
pub struct Ledger {
    db_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to open ledger database {path}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("ledger storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Why a record was left out of a batch upsert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordRejection {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub rd_id: String,
    pub reason: RecordRejection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub skipped: Vec<SkippedRecord>,
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS reports (
  rd_id TEXT PRIMARY KEY,
  id TEXT,
  site TEXT NOT NULL,
  site_url TEXT,
  program TEXT,
  report_type TEXT,
  report_definition TEXT,
  report_definition_url TEXT,
  site_tags TEXT,
  publishing_user TEXT,
  date TEXT NOT NULL,
  time TEXT,
  created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
  pdf_downloaded BOOLEAN DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS idx_reports_date ON reports(date);
";

// The conflict-update form keeps created_at and pdf_downloaded intact when
// the same rd_id is scraped again; INSERT OR REPLACE would reset both.
const UPSERT_SQL: &str = "
INSERT INTO reports(rd_id, id, site, site_url, program, report_type, report_definition,
                    report_definition_url, site_tags, publishing_user, date, time)
VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
ON CONFLICT(rd_id) DO UPDATE SET
  id=excluded.id,
  site=excluded.site,
  site_url=excluded.site_url,
  program=excluded.program,
  report_type=excluded.report_type,
  report_definition=excluded.report_definition,
  report_definition_url=excluded.report_definition_url,
  site_tags=excluded.site_tags,
  publishing_user=excluded.publishing_user,
  date=excluded.date,
  time=excluded.time
";

const SELECT_COLUMNS: &str = "rd_id, id, site, site_url, program, report_type, report_definition,
       report_definition_url, site_tags, publishing_user, date, time,
       created_at, pdf_downloaded";

impl Ledger {
    /// Opens the ledger and ensures its schema exists. Safe to call
    /// repeatedly against the same database file.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let ledger = Self {
            db_path: db_path.into(),
        };

        let connection = ledger.connect()?;
        connection.execute_batch(SCHEMA_SQL)?;
        info!(path = %ledger.db_path.display(), "ledger initialized");

        Ok(ledger)
    }

    fn connect(&self) -> Result<Connection, LedgerError> {
        let connection = Connection::open(&self.db_path).map_err(|source| LedgerError::Open {
            path: self.db_path.display().to_string(),
            source,
        })?;
        connection.pragma_update(None, "journal_mode", "WAL")?;
        connection.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(connection)
    }

    pub fn upsert_one(&self, record: &ReportRecord) -> bool {
        match self.try_upsert_one(record) {
            Ok(()) => true,
            Err(err) => {
                error!(rd_id = %record.rd_id, error = %err, "failed to upsert report");
                false
            }
        }
    }

    pub fn try_upsert_one(&self, record: &ReportRecord) -> Result<(), LedgerError> {
        let connection = self.connect()?;
        connection.execute(UPSERT_SQL, upsert_params(record).as_slice())?;
        Ok(())
    }

    /// Validates and upserts a whole batch inside one transaction. A record
    /// failing validation (or its own insert) is skipped and counted; it
    /// never blocks the remaining records.
    pub fn upsert_batch(&self, records: &[ReportRecord]) -> BatchSummary {
        match self.try_upsert_batch(records) {
            Ok(summary) => {
                info!(
                    inserted = summary.inserted,
                    failed = summary.skipped.len(),
                    total = records.len(),
                    "batch upsert completed"
                );
                summary
            }
            Err(err) => {
                error!(error = %err, "batch upsert failed, no records inserted");
                BatchSummary::default()
            }
        }
    }

    pub fn try_upsert_batch(&self, records: &[ReportRecord]) -> Result<BatchSummary, LedgerError> {
        let mut connection = self.connect()?;
        let tx = connection.transaction()?;
        let mut summary = BatchSummary::default();

        {
            let mut statement = tx.prepare(UPSERT_SQL)?;

            for (index, record) in records.iter().enumerate() {
                if let Err(reason) = validate_record(record) {
                    warn!(index, rd_id = %record.rd_id, %reason, "skipping invalid report");
                    summary.skipped.push(SkippedRecord {
                        index,
                        rd_id: record.rd_id.clone(),
                        reason,
                    });
                    continue;
                }

                match statement.execute(upsert_params(record).as_slice()) {
                    Ok(_) => summary.inserted += 1,
                    Err(err) => {
                        warn!(index, rd_id = %record.rd_id, error = %err, "skipping report on storage failure");
                        summary.skipped.push(SkippedRecord {
                            index,
                            rd_id: record.rd_id.clone(),
                            reason: RecordRejection::Storage(err.to_string()),
                        });
                    }
                }
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    /// Existence probe by primary key; unknown state reads as "not present".
    pub fn exists(&self, rd_id: &str) -> bool {
        match self.try_exists(rd_id) {
            Ok(present) => present,
            Err(err) => {
                error!(rd_id, error = %err, "existence check failed");
                false
            }
        }
    }

    pub fn try_exists(&self, rd_id: &str) -> Result<bool, LedgerError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT 1 FROM reports WHERE rd_id = ?1")?;
        Ok(statement.exists(params![rd_id])?)
    }

    /// Input-order subsequence of records not yet in the ledger. Records
    /// without an `rd_id` cannot be deduplicated and are conservatively
    /// excluded from the result.
    pub fn filter_new(&self, records: &[ReportRecord]) -> Vec<ReportRecord> {
        match self.try_filter_new(records) {
            Ok(new_records) => {
                info!(
                    new = new_records.len(),
                    total = records.len(),
                    "filtered batch against ledger"
                );
                new_records
            }
            Err(err) => {
                error!(error = %err, "new-record filter failed");
                Vec::new()
            }
        }
    }

    pub fn try_filter_new(
        &self,
        records: &[ReportRecord],
    ) -> Result<Vec<ReportRecord>, LedgerError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT 1 FROM reports WHERE rd_id = ?1")?;

        let mut new_records = Vec::new();
        for record in records {
            if record.rd_id.is_empty() {
                continue;
            }
            if !statement.exists(params![record.rd_id])? {
                new_records.push(record.clone());
            }
        }

        Ok(new_records)
    }

    /// Flags a report's companion PDF as retrieved; false when the key is
    /// absent.
    pub fn mark_downloaded(&self, rd_id: &str) -> bool {
        match self.try_mark_downloaded(rd_id) {
            Ok(changed) => changed,
            Err(err) => {
                error!(rd_id, error = %err, "failed to mark pdf downloaded");
                false
            }
        }
    }

    pub fn try_mark_downloaded(&self, rd_id: &str) -> Result<bool, LedgerError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "UPDATE reports SET pdf_downloaded = TRUE WHERE rd_id = ?1",
            params![rd_id],
        )?;
        Ok(changed > 0)
    }

    pub fn reports_by_date(&self, date: &str) -> Vec<StoredReport> {
        match self.try_reports_by_date(date) {
            Ok(rows) => rows,
            Err(err) => {
                error!(date, error = %err, "date query failed");
                Vec::new()
            }
        }
    }

    pub fn try_reports_by_date(&self, date: &str) -> Result<Vec<StoredReport>, LedgerError> {
        let connection = self.connect()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM reports WHERE date = ?1 ORDER BY time DESC"
        );
        let mut statement = connection.prepare(&sql)?;
        let rows = statement
            .query_map(params![date], row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all_reports(&self) -> Vec<StoredReport> {
        match self.try_all_reports() {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "full query failed");
                Vec::new()
            }
        }
    }

    pub fn try_all_reports(&self) -> Result<Vec<StoredReport>, LedgerError> {
        let connection = self.connect()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM reports ORDER BY date DESC, time DESC");
        let mut statement = connection.prepare(&sql)?;
        let rows = statement
            .query_map([], row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> LedgerStats {
        match self.try_stats() {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "stats query failed");
                LedgerStats::default()
            }
        }
    }

    pub fn try_stats(&self) -> Result<LedgerStats, LedgerError> {
        let connection = self.connect()?;

        let total_reports =
            connection.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        let pdfs_downloaded = connection.query_row(
            "SELECT COUNT(*) FROM reports WHERE pdf_downloaded",
            [],
            |row| row.get(0),
        )?;

        let mut statement = connection.prepare(
            "SELECT date, COUNT(*) FROM reports GROUP BY date ORDER BY date DESC LIMIT 10",
        )?;
        let recent_dates = statement
            .query_map([], |row| {
                Ok(DateCount {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LedgerStats {
            total_reports,
            pdfs_downloaded,
            recent_dates,
        })
    }
}

fn validate_record(record: &ReportRecord) -> Result<(), RecordRejection> {
    if record.rd_id.is_empty() {
        return Err(RecordRejection::MissingField("rd_id"));
    }
    if record.site.is_empty() {
        return Err(RecordRejection::MissingField("site"));
    }
    if record.date.is_empty() {
        return Err(RecordRejection::MissingField("date"));
    }
    Ok(())
}

fn upsert_params(record: &ReportRecord) -> [&dyn rusqlite::ToSql; 12] {
    [
        &record.rd_id,
        &record.id,
        &record.site,
        &record.site_url,
        &record.program,
        &record.report_type,
        &record.report_definition,
        &record.report_definition_url,
        &record.site_tags,
        &record.publishing_user,
        &record.date,
        &record.time,
    ]
}

fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredReport> {
    Ok(StoredReport {
        record: ReportRecord {
            rd_id: row.get(0)?,
            id: row.get(1)?,
            site: row.get(2)?,
            site_url: row.get(3)?,
            program: row.get(4)?,
            report_type: row.get(5)?,
            report_definition: row.get(6)?,
            report_definition_url: row.get(7)?,
            site_tags: row.get(8)?,
            publishing_user: row.get(9)?,
            date: row.get(10)?,
            time: row.get(11)?,
        },
        created_at: row.get(12)?,
        pdf_downloaded: row.get(13)?,
    })
}
