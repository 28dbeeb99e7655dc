use tempfile::TempDir;

use super::*;

fn open_ledger(dir: &TempDir) -> Ledger {
    Ledger::open(dir.path().join("reports.db")).expect("open ledger")
}

fn record(rd_id: &str, site: &str, date: &str) -> ReportRecord {
    ReportRecord {
        rd_id: rd_id.to_string(),
        id: format!("site-{rd_id}"),
        site: site.to_string(),
        date: date.to_string(),
        time: "08:00".to_string(),
        ..ReportRecord::default()
    }
}

#[test]
fn open_is_repeatable() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("reports.db");
    Ledger::open(&path).expect("first open");
    Ledger::open(&path).expect("second open");
}

#[test]
fn stats_on_empty_store_are_all_zero() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    let stats = ledger.stats();
    assert_eq!(stats.total_reports, 0);
    assert_eq!(stats.pdfs_downloaded, 0);
    assert!(stats.recent_dates.is_empty());
}

#[test]
fn batch_upsert_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    let batch = vec![
        record("A", "Acme Pond", "2024-01-01"),
        record("B", "Mill Creek", "2024-01-01"),
    ];

    let first = ledger.upsert_batch(&batch);
    let second = ledger.upsert_batch(&batch);

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 2);
    assert_eq!(ledger.stats().total_reports, 2);
}

#[test]
fn invalid_record_is_skipped_without_blocking_siblings() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    let batch = vec![
        record("A", "X", "2024-01-01"),
        ReportRecord {
            site: "Y".to_string(),
            date: "2024-01-02".to_string(),
            ..ReportRecord::default()
        },
    ];

    let summary = ledger.upsert_batch(&batch);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].index, 1);
    assert_eq!(
        summary.skipped[0].reason,
        RecordRejection::MissingField("rd_id")
    );
    assert!(ledger.exists("A"));
}

#[test]
fn validation_names_the_missing_field() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    let batch = vec![
        record("NO_SITE", "", "2024-01-01"),
        record("NO_DATE", "Acme", ""),
    ];

    let summary = ledger.upsert_batch(&batch);
    assert_eq!(summary.inserted, 0);
    assert_eq!(
        summary.skipped[0].reason,
        RecordRejection::MissingField("site")
    );
    assert_eq!(
        summary.skipped[1].reason,
        RecordRejection::MissingField("date")
    );
}

#[test]
fn exists_never_classifies_an_empty_rd_id_as_present() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    ledger.upsert_batch(&[record("A", "X", "2024-01-01")]);

    assert!(!ledger.exists(""));
    assert!(!ledger.exists("missing"));
    assert!(ledger.exists("A"));
}

#[test]
fn filter_new_preserves_order_and_excludes_known_and_keyless_records() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    ledger.upsert_batch(&[record("SEEN", "X", "2024-01-01")]);

    let batch = vec![
        record("N2", "B", "2024-01-02"),
        record("SEEN", "X", "2024-01-01"),
        ReportRecord::default(),
        record("N1", "A", "2024-01-02"),
    ];

    let new_records = ledger.filter_new(&batch);
    let rd_ids: Vec<&str> = new_records
        .iter()
        .map(|record| record.rd_id.as_str())
        .collect();
    assert_eq!(rd_ids, vec!["N2", "N1"]);
}

#[test]
fn mark_downloaded_reports_whether_a_row_changed() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);
    ledger.upsert_batch(&[record("A", "X", "2024-01-01")]);

    assert!(ledger.mark_downloaded("A"));
    assert!(!ledger.mark_downloaded("missing"));

    let stats = ledger.stats();
    assert_eq!(stats.pdfs_downloaded, 1);
}

#[test]
fn reupsert_keeps_created_at_and_download_flag() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    ledger.upsert_batch(&[record("A", "X", "2024-01-01")]);
    ledger.mark_downloaded("A");
    let before = &ledger.reports_by_date("2024-01-01")[0];
    let created_at = before.created_at.clone();

    let mut updated = record("A", "X renamed", "2024-01-01");
    updated.publishing_user = "someone else".to_string();
    ledger.upsert_batch(&[updated]);

    let rows = ledger.reports_by_date("2024-01-01");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.site, "X renamed");
    assert_eq!(rows[0].created_at, created_at);
    assert!(rows[0].pdf_downloaded);
}

#[test]
fn date_query_filters_exactly_and_orders_by_time_desc() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    let mut early = record("E", "Early", "2024-03-01");
    early.time = "08:15".to_string();
    let mut late = record("L", "Late", "2024-03-01");
    late.time = "17:45".to_string();
    let other_day = record("O", "Other", "2024-03-02");
    ledger.upsert_batch(&[early, late, other_day]);

    let rows = ledger.reports_by_date("2024-03-01");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record.rd_id, "L");
    assert_eq!(rows[1].record.rd_id, "E");
}

#[test]
fn full_query_orders_by_date_then_time_desc() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    let mut a = record("A", "A", "2024-03-01");
    a.time = "09:00".to_string();
    let mut b = record("B", "B", "2024-03-02");
    b.time = "08:00".to_string();
    let mut c = record("C", "C", "2024-03-02");
    c.time = "12:00".to_string();
    ledger.upsert_batch(&[a, b, c]);

    let rd_ids: Vec<String> = ledger
        .all_reports()
        .into_iter()
        .map(|row| row.record.rd_id)
        .collect();
    assert_eq!(rd_ids, vec!["C", "B", "A"]);
}

#[test]
fn stats_histogram_caps_at_ten_most_recent_dates() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    let batch: Vec<ReportRecord> = (1..=12)
        .map(|day| record(&format!("R{day}"), "Site", &format!("2024-01-{day:02}")))
        .collect();
    ledger.upsert_batch(&batch);

    let stats = ledger.stats();
    assert_eq!(stats.total_reports, 12);
    assert_eq!(stats.recent_dates.len(), 10);
    assert_eq!(stats.recent_dates[0].date, "2024-01-12");
    assert_eq!(stats.recent_dates[0].count, 1);
    assert_eq!(stats.recent_dates[9].date, "2024-01-03");
}

#[test]
fn try_upsert_batch_exposes_storage_failure_reasons() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    let summary = ledger
        .try_upsert_batch(&[record("A", "X", "2024-01-01")])
        .expect("batch");
    assert_eq!(summary.inserted, 1);
    assert!(summary.skipped.is_empty());
}

#[test]
fn single_upsert_reports_success() {
    let dir = TempDir::new().expect("tempdir");
    let ledger = open_ledger(&dir);

    assert!(ledger.upsert_one(&record("A", "X", "2024-01-01")));
    assert!(ledger.exists("A"));
}
