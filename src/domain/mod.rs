//! Domain models for jbscrape
//!
//! The classification pipeline, free of any I/O:
//!
//! ```text
//! RawListing ──► Classifier ──► AnnotatedListing ──► build_report ──► Report
//!                  │    │
//!      extract_versions  CompatibilityTable
//! ```

mod classify;
mod compat;
mod listing;
mod price;
mod report;
mod version;

pub use classify::{AnnotatedListing, Classifier, Verdict};
pub use compat::{
    normalize_model, CompatibilityRule, CompatibilityTable, DeviceSupport, DEVICES,
    JAILBREAKABLE_RANGES,
};
pub use listing::{RawListing, SourceSite};
pub use price::Price;
pub use report::{build_report, RejectionTally, Report, ReportEntry, ReportGroup};
pub use version::{
    extract_versions, mentions, IosVersion, Mentions, VersionError, VersionMention, VersionRange,
};
