use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, multipart};
use tracing::info;

use crate::model::ReportRecord;

/// One PDF slotted into the outgoing multipart request. The key carries
/// the `pdf_<id>_<rd_id>` composite the downstream workflow expects.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub key: String,
    pub filename: String,
    pub path: PathBuf,
}

pub struct WebhookClient {
    url: String,
    client: Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build webhook http client")?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Sends the whole batch in a single request: a `reports` part holding
    /// the JSON array of every record (matched or not) plus one file part
    /// per matched PDF.
    pub fn send_report_batch(
        &self,
        records: &[ReportRecord],
        attachments: &[Attachment],
    ) -> Result<()> {
        let reports_json =
            serde_json::to_string(records).context("failed to serialize report batch")?;
        let mut form = multipart::Form::new().text("reports", reports_json);

        for attachment in attachments {
            let part = multipart::Part::file(&attachment.path)
                .with_context(|| {
                    format!("failed to read attachment {}", attachment.path.display())
                })?
                .file_name(attachment.filename.clone())
                .mime_str("application/pdf")
                .context("failed to tag attachment content type")?;
            form = form.part(attachment.key.clone(), part);
        }

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .context("webhook request failed")?;

        if !response.status().is_success() {
            bail!("webhook returned status {}", response.status());
        }

        info!(
            reports = records.len(),
            attachments = attachments.len(),
            "webhook batch delivered"
        );
        Ok(())
    }
}
