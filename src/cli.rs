use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "stormwater",
    version,
    about = "Stormwater compliance report ledger and webhook forwarding tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one scraped report batch: dedup, ledger upsert, PDF matching, webhook forward
    Process(ProcessArgs),
    /// Summarize ledger contents
    Status(StatusArgs),
    /// List ledger rows, optionally filtered by date
    Reports(ReportsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// JSON array of report records produced by the scraping collaborator
    #[arg(long, default_value = "reports.json")]
    pub reports_path: PathBuf,

    /// Directory holding the downloaded PDF files for this batch
    #[arg(long, default_value = "downloads")]
    pub downloads_dir: PathBuf,

    #[arg(long, default_value = "reports.db")]
    pub db_path: PathBuf,

    /// Target date (YYYY-MM-DD); defaults to the date of the first scraped record
    #[arg(long)]
    pub date: Option<String>,

    /// Webhook endpoint; falls back to REPORTS_WEBHOOK_URL
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Run everything except the webhook send
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "reports.db")]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ReportsArgs {
    #[arg(long, default_value = "reports.db")]
    pub db_path: PathBuf,

    /// Restrict to an exact date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write the rows as pretty JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}
