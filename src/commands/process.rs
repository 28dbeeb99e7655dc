use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::ledger::Ledger;
use crate::matcher::match_reports_to_files;
use crate::model::ReportRecord;
use crate::util::validate_iso_date;
use crate::webhook::{Attachment, WebhookClient};

const WEBHOOK_URL_ENV: &str = "REPORTS_WEBHOOK_URL";

pub fn run(args: ProcessArgs) -> Result<()> {
    let records = load_report_batch(&args.reports_path)?;
    if records.is_empty() {
        warn!(path = %args.reports_path.display(), "scraped batch is empty, nothing to process");
        return Ok(());
    }

    let filter_date = resolve_target_date(&args, &records)?;
    info!(date = %filter_date, "processing report batch");

    let batch: Vec<ReportRecord> = records
        .into_iter()
        .filter(|record| record.date == filter_date)
        .collect();
    if batch.is_empty() {
        warn!(date = %filter_date, "no scraped records for the target date");
        return Ok(());
    }

    let ledger = Ledger::open(&args.db_path)
        .with_context(|| format!("failed to initialize ledger at {}", args.db_path.display()))?;

    let new_records = ledger.filter_new(&batch);
    if new_records.is_empty() {
        info!("every record in this batch was seen on a previous run");
    }

    let summary = ledger.upsert_batch(&batch);
    if summary.inserted == 0 {
        warn!("no records made it into the ledger");
    }

    let filenames = list_pdf_filenames(&args.downloads_dir)?;
    info!(
        files = filenames.len(),
        dir = %args.downloads_dir.display(),
        "enumerated downloaded pdf files"
    );

    let matches = match_reports_to_files(&batch, &filenames);
    for file_match in &matches {
        let record = &batch[file_match.record_index];
        if file_match.fallback {
            warn!(
                file = %filenames[file_match.file_index],
                site = %record.site,
                "fallback-paired pdf with no filename evidence"
            );
        } else {
            info!(
                file = %filenames[file_match.file_index],
                site = %record.site,
                score = file_match.score,
                "matched pdf to report"
            );
        }
        ledger.mark_downloaded(&record.rd_id);
    }

    let unmatched = batch.len() - matches.len();
    if unmatched > 0 {
        warn!(unmatched, "reports left without a paired pdf");
    }

    if filenames.is_empty() {
        warn!("no pdf files downloaded, skipping webhook send");
        return Ok(());
    }

    let webhook_url = args
        .webhook_url
        .clone()
        .or_else(|| std::env::var(WEBHOOK_URL_ENV).ok());
    let Some(webhook_url) = webhook_url else {
        warn!("no webhook url configured, skipping webhook send");
        return Ok(());
    };

    let attachments: Vec<Attachment> = matches
        .iter()
        .map(|file_match| {
            let record = &batch[file_match.record_index];
            let filename = filenames[file_match.file_index].clone();
            Attachment {
                key: format!("pdf_{}_{}", record.id, record.rd_id),
                path: args.downloads_dir.join(&filename),
                filename,
            }
        })
        .collect();

    if args.dry_run {
        info!(
            reports = batch.len(),
            attachments = attachments.len(),
            "dry run, webhook send skipped"
        );
        return Ok(());
    }

    let client = WebhookClient::new(webhook_url)?;
    client.send_report_batch(&batch, &attachments)?;

    Ok(())
}

fn load_report_batch(path: &Path) -> Result<Vec<ReportRecord>> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read report batch {}", path.display()))?;
    let records: Vec<ReportRecord> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse report batch {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "loaded scraped report batch");
    Ok(records)
}

/// An explicit `--date` wins; otherwise the date of the first scraped
/// record is used, since the portal lists newest first.
fn resolve_target_date(args: &ProcessArgs, records: &[ReportRecord]) -> Result<String> {
    if let Some(date) = &args.date {
        validate_iso_date(date)?;
        return Ok(date.clone());
    }

    let first_date = &records[0].date;
    if first_date.is_empty() {
        bail!("first scraped record carries no date and no --date was given");
    }
    Ok(first_date.clone())
}

/// Sorted so that matching sees the same discovery order on every
/// filesystem.
fn list_pdf_filenames(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read downloads directory {}", dir.display()))?;

    let mut filenames = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to list downloads directory {}", dir.display()))?;
        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename.ends_with(".pdf") {
            filenames.push(filename);
        }
    }

    filenames.sort();
    Ok(filenames)
}
