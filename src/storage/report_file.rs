//! JSON report file
//!
//! The on-disk shape of a [`Report`]. Field names are stable; unknown values
//! are written as `null` rather than omitted so consumers see a fixed schema.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;

use crate::domain::{RejectionTally, Report, ReportEntry, ReportGroup, SourceSite};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub title: String,
    pub price: Option<String>,
    pub price_value: Option<f64>,
    pub currency: Option<String>,
    pub url: String,
    pub site: SourceSite,
    pub ios_version: String,
    pub item_id: Option<String>,
    pub storage: Option<String>,
    pub jailbroken: bool,
}

impl From<&ReportEntry> for ListingSummary {
    fn from(entry: &ReportEntry) -> Self {
        let listing = &entry.listing;
        Self {
            title: listing.title.clone(),
            price: listing.price.as_ref().map(|p| p.to_string()),
            price_value: listing.price.as_ref().map(|p| p.amount()),
            currency: listing.price.as_ref().map(|p| p.currency().to_string()),
            url: listing.source_url.clone(),
            site: listing.source_site,
            ios_version: entry.ios_version.to_string(),
            item_id: listing.item_id.clone(),
            storage: entry.storage.clone(),
            jailbroken: entry.jailbroken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub model: String,
    pub count: usize,
    pub listings: Vec<ListingSummary>,
}

impl From<&ReportGroup> for GroupSummary {
    fn from(group: &ReportGroup) -> Self {
        Self {
            model: group.model.clone(),
            count: group.entries.len(),
            listings: group.entries.iter().map(ListingSummary::from).collect(),
        }
    }
}

/// A report as written to disk and printed with `--format json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub searched_at: DateTime<Utc>,
    pub total_count: usize,
    pub groups: Vec<GroupSummary>,
    pub rejections: RejectionTally,
}

impl ReportDocument {
    pub fn new(report: &Report, searched_at: DateTime<Utc>) -> Self {
        Self {
            searched_at,
            total_count: report.total_count(),
            groups: report.groups.iter().map(GroupSummary::from).collect(),
            rejections: report.rejections,
        }
    }

    /// Writes the document atomically (temp file + rename)
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on report file")?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, self).context("Failed to serialize report")?;
            writeln!(writer).context("Failed to write report")?;
            writer.flush().context("Failed to flush report")?;
        }

        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
