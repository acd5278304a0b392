//! jbscrape - find used iPhones still running a jailbreakable iOS version
//!
//! Listings are scraped from eBay and Swappa, the iOS version each seller
//! claims is extracted from the listing text, and the claim is checked
//! against what the advertised model could ever have run. Survivors are
//! grouped by model and ordered by price.

pub mod cli;
pub mod domain;
pub mod sources;
pub mod storage;

pub use domain::{
    build_report, extract_versions, AnnotatedListing, Classifier, CompatibilityTable, IosVersion,
    Price, RawListing, Report, SourceSite, Verdict,
};
