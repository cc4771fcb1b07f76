//! Per-channel export jobs and the sequential run loop.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    channel::{output_path, ChannelRef},
    domain::MessageId,
    errors::Error,
    filter::ExportFilter,
    history::HistoryStream,
    ports::HistorySource,
    writer::{last_exported_id, MarkdownWriter, WriteMode},
    Result,
};

/// Filter and file policy shared by every job of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub only_text: bool,
    pub append_mode: bool,
    /// In append mode, continue after the last message already in the file.
    pub resume: bool,
    pub page_size: u32,
    pub progress_interval: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            from_date: None,
            to_date: None,
            only_text: false,
            append_mode: true,
            resume: true,
            page_size: 100,
            progress_interval: 100,
        }
    }
}

impl ExportOptions {
    pub fn filter(&self) -> ExportFilter {
        ExportFilter {
            from_date: self.from_date,
            to_date: self.to_date,
            only_text: self.only_text,
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.append_mode {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        }
    }
}

/// Result of one completed channel job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub channel: String,
    pub path: PathBuf,
    pub exported: u64,
    pub skipped_no_text: u64,
    pub skipped_out_of_range: u64,
    pub resumed_after: Option<MessageId>,
}

/// Export one channel reference into `output_dir`.
///
/// Any error aborts only this job; blocks already written stay on disk.
pub async fn export_channel(
    source: &dyn HistorySource,
    reference: &str,
    options: &ExportOptions,
    output_dir: &Path,
) -> Result<ExportSummary> {
    let parsed = ChannelRef::parse(reference)?;
    let channel = source.resolve(&parsed).await?;
    let label = channel.display_name();
    let path = output_path(output_dir, &channel);

    let resumed_after = if options.append_mode && options.resume {
        last_exported_id(&path)?
    } else {
        None
    };

    info!(
        channel = %label,
        path = %path.display(),
        resume_after = resumed_after.map(|id| id.0),
        "exporting channel"
    );

    let mut writer = MarkdownWriter::open(&path, options.write_mode())?;
    let mut stream = HistoryStream::new(
        source,
        channel.peer,
        options.filter(),
        options.page_size,
        resumed_after,
    );

    let progress_every = options.progress_interval.max(1);
    while let Some(record) = stream.next().await? {
        writer.append(&record)?;
        if writer.written() % progress_every == 0 {
            info!(channel = %label, exported = writer.written(), "progress");
        }
    }

    let stats = stream.stats();
    let summary = ExportSummary {
        channel: label,
        path,
        exported: writer.written(),
        skipped_no_text: stats.skipped_no_text,
        skipped_out_of_range: stats.skipped_out_of_range,
        resumed_after,
    };

    info!(
        channel = %summary.channel,
        exported = summary.exported,
        fetched = stats.fetched,
        pages = stats.pages,
        skipped_no_text = summary.skipped_no_text,
        skipped_media_only = stats.skipped_media_only,
        skipped_out_of_range = summary.skipped_out_of_range,
        "channel complete"
    );
    Ok(summary)
}

/// A job that did not complete.
#[derive(Debug)]
pub struct JobFailure {
    pub reference: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<ExportSummary>,
    pub failed: Vec<JobFailure>,
}

impl RunReport {
    pub fn total_exported(&self) -> u64 {
        self.succeeded.iter().map(|s| s.exported).sum()
    }
}

/// Run every job in order. Per-channel failures are logged and recorded; a
/// fatal error (config/auth) stops the run and is returned.
pub async fn run_jobs(
    source: &dyn HistorySource,
    references: &[String],
    options: &ExportOptions,
    output_dir: &Path,
) -> Result<RunReport> {
    std::fs::create_dir_all(output_dir)?;

    let mut report = RunReport::default();
    for reference in references {
        match export_channel(source, reference, options, output_dir).await {
            Ok(summary) => report.succeeded.push(summary),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                if matches!(e, Error::ChannelNotFound(_) | Error::ChannelNotAccessible(_)) {
                    warn!(channel = %reference, error = %e, "skipping channel");
                } else {
                    error!(channel = %reference, kind = e.kind(), error = %e, "channel export failed");
                }
                report.failed.push(JobFailure {
                    reference: reference.clone(),
                    error: e,
                });
            }
        }
    }
    Ok(report)
}
