//! Shared tail of `scan` and `classify`: write the report, publish the note, print
//!
//! Only the report file is load-bearing. A note that cannot be published is a
//! warning; a report that cannot be written fails the command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};

use super::output::Output;
use crate::domain::Report;
use crate::storage::{
    AppleNotes, Config, MarkdownNotes, Note, NoteSink, NotesBackend, NotesConfig, ReportDocument,
};

/// Where the report goes and what else to do with it
pub struct PublishPlan {
    pub output_path: PathBuf,
    pub max_price_cents: Option<u64>,
    /// None when no note is wanted
    pub notes: Option<NotesConfig>,
    pub per_model_display: usize,
    pub display_limit: usize,
}

impl PublishPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_path: config.report.output.clone(),
            max_price_cents: config.max_price_cents(),
            notes: config.notes.enabled.then(|| config.notes.clone()),
            per_model_display: config.report.per_model_display,
            display_limit: config.report.display_limit,
        }
    }
}

fn note_sink(notes: &NotesConfig) -> Box<dyn NoteSink> {
    match notes.backend {
        NotesBackend::AppleNotes => Box::new(AppleNotes::new(notes.overwrite)),
        NotesBackend::Markdown => Box::new(MarkdownNotes::new(notes.dir.clone(), notes.overwrite)),
    }
}

pub fn publish(output: &Output, report: Report, plan: &PublishPlan) -> Result<ReportDocument> {
    let report = match plan.max_price_cents {
        Some(max) => {
            let before = report.total_count();
            let report = report.with_price_ceiling(max);
            tracing::debug!(max_cents = max, dropped = before - report.total_count(), "Applied price ceiling");
            report
        }
        None => report,
    };

    let document = ReportDocument::new(&report, Utc::now());
    document
        .write_to(&plan.output_path)
        .with_context(|| format!("Failed to write report to {}", plan.output_path.display()))?;

    if output.is_json() {
        output.data(&document);
    } else {
        print_summary(&document, plan.per_model_display, plan.display_limit);
        output.success(&format!(
            "Saved {} listings to {}",
            document.total_count,
            plan.output_path.display()
        ));
    }

    if let Some(notes) = &plan.notes {
        let sink = note_sink(notes);
        let note = Note::from_document(notes.title.clone(), &document);
        match sink.publish(&note) {
            Ok(location) => {
                let verb = if notes.overwrite { "Replaced" } else { "Created" };
                output.success(&format!("{verb} note: {location}"));
            }
            Err(e) => {
                tracing::warn!(backend = sink.name(), error = %e, "Note export failed");
                output.warn(&format!("Could not create note ({}): {}", sink.name(), e));
            }
        }
    }

    Ok(document)
}

/// Grouped results table, capped per model and overall
fn print_summary(document: &ReportDocument, per_model: usize, limit: usize) {
    println!("{}", "=".repeat(70));
    println!(
        "RESULTS: {} listings | {}",
        document.total_count,
        document.searched_at.with_timezone(&Local).format("%b %d, %Y %H:%M")
    );
    println!("{}", "=".repeat(70));

    if document.groups.is_empty() {
        println!("No jailbreakable listings found.");
    }

    let mut shown = 0;
    for group in &document.groups {
        if shown >= limit {
            break;
        }
        println!();
        println!("{} ({})", group.model, group.count);
        println!("{}", "-".repeat(40));

        for listing in group.listings.iter().take(per_model) {
            if shown >= limit {
                break;
            }
            let jb = if listing.jailbroken { " [JB]" } else { "" };
            println!(
                "  {:<12} | {:<6} | iOS {:<8} | {}{}",
                listing.price.as_deref().unwrap_or("N/A"),
                listing.storage.as_deref().unwrap_or(""),
                listing.ios_version,
                listing.site,
                jb
            );
            shown += 1;
        }
    }

    let r = &document.rejections;
    if r.total() > 0 {
        println!();
        println!(
            "Rejected: {} without a version, {} incompatible, {} unknown model",
            r.no_version_found, r.incompatible, r.unknown_model
        );
    }
    println!();
}
