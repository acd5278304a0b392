//! # Storage Layer
//!
//! Everything jbscrape reads from or writes to disk.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config | TOML | `~/.config/jbscrape/config.toml`, `--config`, `$JBSCRAPE_CONFIG` |
//! | Report | Pretty JSON | `jbscrape_results.json` or `-o PATH` |
//! | Offline input | JSON array of listings | `jbscrape classify PATH` (or `-`) |
//! | Notes | Markdown + YAML frontmatter | `<notes.dir>/<slug>.md` |
//!
//! ## Write Safety
//!
//! - The report is written to a temp file under an exclusive `fs2` lock, then renamed
//! - Markdown notes use the same temp file + rename
//!
//! ## Key Types
//!
//! - [`Config`] - Search, report and notes settings
//! - [`ReportDocument`] - Stable JSON shape of a report
//! - [`NoteSink`] - Apple Notes or Markdown note publishing

mod config;
mod listings_file;
mod notes;
mod report_file;

pub use config::{Config, ConfigError, NotesBackend, NotesConfig, ReportConfig, SearchConfig};
pub use listings_file::{parse_listings, read_listings};
pub use notes::{AppleNotes, MarkdownNotes, Note, NoteLine, NoteSection, NoteSink, NotesError, NOTE_MARKER};
pub use report_file::{GroupSummary, ListingSummary, ReportDocument};
