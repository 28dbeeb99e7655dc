use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReportsArgs;
use crate::ledger::Ledger;
use crate::util::{validate_iso_date, write_json_pretty};

pub fn run(args: ReportsArgs) -> Result<()> {
    let ledger = Ledger::open(&args.db_path)
        .with_context(|| format!("failed to open ledger at {}", args.db_path.display()))?;

    let rows = match &args.date {
        Some(date) => {
            validate_iso_date(date)?;
            ledger.reports_by_date(date)
        }
        None => ledger.all_reports(),
    };

    if let Some(output) = &args.output {
        write_json_pretty(output, &rows)?;
        info!(count = rows.len(), path = %output.display(), "wrote report listing");
    }

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&rows).context("failed to render report listing")?;
        println!("{rendered}");
    } else {
        for row in &rows {
            info!(
                rd_id = %row.record.rd_id,
                site = %row.record.site,
                date = %row.record.date,
                time = %row.record.time,
                downloaded = row.pdf_downloaded,
                "report"
            );
        }
        info!(count = rows.len(), "report listing complete");
    }

    Ok(())
}
