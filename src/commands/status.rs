use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::ledger::Ledger;

pub fn run(args: StatusArgs) -> Result<()> {
    if !args.db_path.exists() {
        warn!(path = %args.db_path.display(), "ledger database missing");
        return Ok(());
    }

    let ledger = Ledger::open(&args.db_path)
        .with_context(|| format!("failed to open ledger at {}", args.db_path.display()))?;
    let stats = ledger.stats();

    info!(
        path = %args.db_path.display(),
        total = stats.total_reports,
        downloaded = stats.pdfs_downloaded,
        "ledger status"
    );
    for entry in &stats.recent_dates {
        info!(date = %entry.date, count = entry.count, "reports on date");
    }

    Ok(())
}
