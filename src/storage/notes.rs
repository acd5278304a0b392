//! Human-readable note export
//!
//! | Backend | Destination |
//! |---------|-------------|
//! | `apple_notes` | macOS Notes via `osascript`, iCloud account when present |
//! | `markdown` | `<dir>/<slug>.md` with YAML frontmatter |
//!
//! Every note ends with a footer containing [`NOTE_MARKER`]. With overwrite
//! enabled the Apple Notes backend only deletes earlier notes that carry it,
//! so notes a user wrote by hand under the same title survive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use thiserror::Error;

use super::report_file::ReportDocument;
use crate::domain::SourceSite;

pub const NOTE_MARKER: &str = "Generated by jbscrape";

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("Notes backend unavailable: {0}")]
    Unavailable(String),

    #[error("osascript failed: {0}")]
    Script(String),

    #[error("Failed to render note: {0}")]
    Render(String),

    #[error("Failed to write note: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteLine {
    pub price: Option<String>,
    pub storage: Option<String>,
    pub ios_version: String,
    pub jailbroken: bool,
    pub url: String,
    pub site: SourceSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteSection {
    pub model: String,
    pub lines: Vec<NoteLine>,
}

/// A rendered-on-demand summary of one report
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub total_count: usize,
    pub sections: Vec<NoteSection>,
}

impl Note {
    pub fn from_document(title: impl Into<String>, doc: &ReportDocument) -> Self {
        let sections = doc
            .groups
            .iter()
            .map(|group| NoteSection {
                model: group.model.clone(),
                lines: group
                    .listings
                    .iter()
                    .map(|l| NoteLine {
                        price: l.price.clone(),
                        storage: l.storage.clone(),
                        ios_version: l.ios_version.clone(),
                        jailbroken: l.jailbroken,
                        url: l.url.clone(),
                        site: l.site,
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: title.into(),
            generated_at: doc.searched_at,
            total_count: doc.total_count,
            sections,
        }
    }

    fn header_date(&self) -> String {
        self.generated_at.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
    }

    /// Body for Apple Notes
    pub fn to_html(&self) -> String {
        let mut lines = vec![
            format!("<p><b>{} listings</b> | {}</p>", self.total_count, self.header_date()),
            "<hr>".to_string(),
        ];

        for section in &self.sections {
            lines.push(format!(
                "<h2>{} ({})</h2>",
                escape_html(&section.model),
                section.lines.len()
            ));
            for line in &section.lines {
                lines.push(format!(
                    "<p><b>{}</b> - {} - iOS {}{} - <a href=\"{}\">{}</a></p>",
                    escape_html(line.price.as_deref().unwrap_or("N/A")),
                    escape_html(line.storage.as_deref().unwrap_or("")),
                    line.ios_version,
                    if line.jailbroken { " [JB]" } else { "" },
                    escape_html(&line.url),
                    line.site.label(),
                ));
            }
            lines.push("<br>".to_string());
        }

        lines.push("<hr>".to_string());
        lines.push(format!("<p><i>JB = Jailbroken | {NOTE_MARKER}</i></p>"));
        lines.join("\n")
    }

    /// Body for the Markdown backend, without frontmatter
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n**{} listings** | {}\n", self.title, self.total_count, self.header_date());

        for section in &self.sections {
            out.push_str(&format!("\n## {} ({})\n\n", section.model, section.lines.len()));
            for line in &section.lines {
                let mut parts = vec![format!("**{}**", line.price.as_deref().unwrap_or("N/A"))];
                if let Some(storage) = &line.storage {
                    parts.push(storage.clone());
                }
                let jb = if line.jailbroken { " [JB]" } else { "" };
                parts.push(format!("iOS {}{}", line.ios_version, jb));
                parts.push(format!("[{}]({})", line.site.label(), line.url));
                out.push_str(&format!("- {}\n", parts.join(" - ")));
            }
        }

        out.push_str(&format!("\n---\n\n*JB = Jailbroken | {NOTE_MARKER}*\n"));
        out
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Somewhere a note can be published
pub trait NoteSink {
    fn name(&self) -> &'static str;

    /// Publishes the note, returning where it went
    fn publish(&self, note: &Note) -> Result<String, NotesError>;
}

/// macOS Notes through AppleScript
pub struct AppleNotes {
    overwrite: bool,
}

impl AppleNotes {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    fn run(script: &str) -> Result<String, NotesError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => NotesError::Unavailable("osascript not found (macOS only)".to_string()),
                _ => NotesError::Io(e),
            })?;

        if !output.status.success() {
            return Err(NotesError::Script(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn account() -> Result<String, NotesError> {
        let names = Self::run(LIST_ACCOUNTS_SCRIPT)?;
        pick_account(&names).ok_or_else(|| NotesError::Unavailable("no Notes accounts found".to_string()))
    }
}

impl NoteSink for AppleNotes {
    fn name(&self) -> &'static str {
        "apple_notes"
    }

    fn publish(&self, note: &Note) -> Result<String, NotesError> {
        let account = Self::account()?;
        tracing::debug!(account = %account, "Using Notes account");

        if self.overwrite {
            Self::run(&delete_script(&account, &note.title))?;
        }
        Self::run(&create_script(&account, &note.title, &note.to_html()))?;

        Ok(format!("Notes ({account}): {}", note.title))
    }
}

const LIST_ACCOUNTS_SCRIPT: &str = r#"tell application "Notes"
    return name of every account
end tell"#;

/// Prefers iCloud, then the first account listed
fn pick_account(names: &str) -> Option<String> {
    let accounts: Vec<&str> = names.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();
    accounts
        .iter()
        .find(|a| **a == "iCloud")
        .or_else(|| accounts.first())
        .map(|a| a.to_string())
}

fn applescript_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn delete_script(account: &str, title: &str) -> String {
    format!(
        r#"tell application "Notes"
    tell account {account}
        set existingNotes to (every note whose name is {title})
        repeat with aNote in existingNotes
            if body of aNote contains {marker} then
                delete aNote
            end if
        end repeat
    end tell
end tell"#,
        account = applescript_string(account),
        title = applescript_string(title),
        marker = applescript_string(NOTE_MARKER),
    )
}

fn create_script(account: &str, title: &str, body: &str) -> String {
    format!(
        r#"tell application "Notes"
    tell account {account}
        make new note at folder "Notes" with properties {{name:{title}, body:{body}}}
    end tell
end tell"#,
        account = applescript_string(account),
        title = applescript_string(title),
        body = applescript_string(body),
    )
}

#[derive(Serialize)]
struct NoteFrontmatter<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    total_count: usize,
}

/// Markdown files with YAML frontmatter
pub struct MarkdownNotes {
    dir: PathBuf,
    overwrite: bool,
}

impl MarkdownNotes {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
        }
    }

    /// Target path: `<slug>.md`, or a timestamped sibling when not overwriting
    fn note_path(&self, note: &Note) -> PathBuf {
        let slug = slugify(&note.title);
        let path = self.dir.join(format!("{slug}.md"));
        if self.overwrite || !path.exists() {
            return path;
        }
        let stamp = note.generated_at.format("%Y%m%d-%H%M%S");
        self.dir.join(format!("{slug}-{stamp}.md"))
    }

    fn render(note: &Note) -> Result<String, NotesError> {
        let frontmatter = NoteFrontmatter {
            title: &note.title,
            generated_at: note.generated_at,
            total_count: note.total_count,
        };
        let yaml = serde_yaml::to_string(&frontmatter).map_err(|e| NotesError::Render(e.to_string()))?;

        let mut content = String::new();
        content.push_str("---\n");
        content.push_str(&yaml);
        content.push_str("---\n\n");
        content.push_str(&note.to_markdown());
        Ok(content)
    }

    fn write_atomic(path: &Path, content: &str) -> Result<(), NotesError> {
        let temp_path = path.with_extension("md.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl NoteSink for MarkdownNotes {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn publish(&self, note: &Note) -> Result<String, NotesError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.note_path(note);
        Self::write_atomic(&path, &Self::render(note)?)?;
        Ok(path.display().to_string())
    }
}

/// `Jailbreakable iPhones!` -> `jailbreakable-iphones`
fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "note".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::report_file::{GroupSummary, ListingSummary};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_note() -> Note {
        let doc = ReportDocument {
            searched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            total_count: 2,
            groups: vec![GroupSummary {
                model: "iPhone 13".to_string(),
                count: 2,
                listings: vec![
                    ListingSummary {
                        title: "iPhone 13 128GB jailbroken iOS 16.5".to_string(),
                        price: Some("$150.00".to_string()),
                        price_value: Some(150.0),
                        currency: Some("USD".to_string()),
                        url: "https://www.ebay.com/itm/1?a=1&b=2".to_string(),
                        site: SourceSite::Ebay,
                        ios_version: "16.5".to_string(),
                        item_id: Some("1".to_string()),
                        storage: Some("128GB".to_string()),
                        jailbroken: true,
                    },
                    ListingSummary {
                        title: "iPhone 13".to_string(),
                        price: None,
                        price_value: None,
                        currency: None,
                        url: "https://swappa.com/listing/view/L1".to_string(),
                        site: SourceSite::Swappa,
                        ios_version: "16.1.2".to_string(),
                        item_id: Some("L1".to_string()),
                        storage: None,
                        jailbroken: false,
                    },
                ],
            }],
            rejections: Default::default(),
        };
        Note::from_document("Jailbreakable iPhones", &doc)
    }

    #[test]
    fn html_body() {
        let html = sample_note().to_html();
        assert!(html.starts_with("<p><b>2 listings</b>"));
        assert!(html.contains("<h2>iPhone 13 (2)</h2>"));
        assert!(html.contains(
            "<p><b>$150.00</b> - 128GB - iOS 16.5 [JB] - <a href=\"https://www.ebay.com/itm/1?a=1&amp;b=2\">eBay</a></p>"
        ));
        assert!(html.contains("<b>N/A</b> -  - iOS 16.1.2 - "));
        assert!(html.ends_with("<p><i>JB = Jailbroken | Generated by jbscrape</i></p>"));
    }

    #[test]
    fn markdown_body() {
        let md = sample_note().to_markdown();
        assert!(md.starts_with("# Jailbreakable iPhones\n"));
        assert!(md.contains("## iPhone 13 (2)"));
        assert!(md.contains("- **$150.00** - 128GB - iOS 16.5 [JB] - [eBay](https://www.ebay.com/itm/1?a=1&b=2)"));
        assert!(md.contains("- **N/A** - iOS 16.1.2 - [Swappa](https://swappa.com/listing/view/L1)"));
        assert!(md.contains(NOTE_MARKER));
    }

    #[test]
    fn pick_account_prefers_icloud() {
        assert_eq!(pick_account("On My Mac, iCloud").as_deref(), Some("iCloud"));
        assert_eq!(pick_account("Work, On My Mac").as_deref(), Some("Work"));
        assert_eq!(pick_account(""), None);
    }

    #[test]
    fn scripts_escape_quotes() {
        let script = create_script("iCloud", "My \"list\"", "<a href=\"x\">y</a>");
        assert!(script.contains(r#"name:"My \"list\"""#));
        assert!(script.contains(r#"body:"<a href=\"x\">y</a>""#));

        let script = delete_script("iCloud", "Jailbreakable iPhones");
        assert!(script.contains(r#"every note whose name is "Jailbreakable iPhones""#));
        assert!(script.contains(r#"contains "Generated by jbscrape""#));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Jailbreakable iPhones!"), "jailbreakable-iphones");
        assert_eq!(slugify("  --  "), "note");
    }

    #[test]
    fn markdown_overwrite_replaces_file() {
        let dir = TempDir::new().unwrap();
        let sink = MarkdownNotes::new(dir.path(), true);
        let note = sample_note();

        let first = sink.publish(&note).unwrap();
        let second = sink.publish(&note).unwrap();
        assert_eq!(first, second);

        let content = fs::read_to_string(dir.path().join("jailbreakable-iphones.md")).unwrap();
        assert!(content.starts_with("---\n"));
        assert!(content.contains("title: Jailbreakable iPhones"));
        assert!(content.contains("total_count: 2"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn markdown_without_overwrite_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("jailbreakable-iphones.md");
        fs::write(&existing, "hand-written").unwrap();

        let sink = MarkdownNotes::new(dir.path(), false);
        let path = sink.publish(&sample_note()).unwrap();

        assert!(path.ends_with("jailbreakable-iphones-20240501-120000.md"));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "hand-written");
    }
}
