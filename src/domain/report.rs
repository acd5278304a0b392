//! Report building
//!
//! Groups accepted listings by model and orders each group by price, unknown
//! prices last. Output order is fully determined by the input so that reports
//! from identical runs diff cleanly.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::classify::{AnnotatedListing, Verdict};
use super::listing::RawListing;
use super::version::IosVersion;

static STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,4})\s*(GB|TB)\b").unwrap());

/// One accepted listing inside a report group
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub listing: RawListing,
    pub ios_version: IosVersion,
    /// Storage capacity from the title, e.g. `128GB`
    pub storage: Option<String>,
    /// Seller says the device is already jailbroken
    pub jailbroken: bool,
}

impl ReportEntry {
    fn new(listing: RawListing, ios_version: IosVersion) -> Self {
        let storage = STORAGE
            .captures(&listing.title)
            .map(|caps| format!("{}{}", &caps[1], caps[2].to_uppercase()));
        let jailbroken = listing.title.to_lowercase().contains("jailbroken");

        Self {
            listing,
            ios_version,
            storage,
            jailbroken,
        }
    }

    fn sort_key(&self) -> (bool, u64) {
        match &self.listing.price {
            Some(price) => (false, price.cents()),
            None => (true, 0),
        }
    }
}

/// All listings for one model, cheapest first
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub model: String,
    pub entries: Vec<ReportEntry>,
}

/// How many listings were turned away, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionTally {
    pub no_version_found: usize,
    pub incompatible: usize,
    pub unknown_model: usize,
}

impl RejectionTally {
    pub fn total(&self) -> usize {
        self.no_version_found + self.incompatible + self.unknown_model
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub groups: Vec<ReportGroup>,
    pub rejections: RejectionTally,
}

impl Report {
    /// Number of accepted listings across all groups
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drops priced listings above `max_cents`; listings without a price stay
    pub fn with_price_ceiling(mut self, max_cents: u64) -> Self {
        for group in &mut self.groups {
            group
                .entries
                .retain(|e| e.listing.price.as_ref().map_or(true, |p| p.cents() <= max_cents));
        }
        self.groups.retain(|g| !g.entries.is_empty());
        self
    }
}

/// Builds a report from classified listings
///
/// Only accepted listings are kept. Groups are keyed case- and
/// whitespace-insensitively and ordered by that key; the group name is the
/// first spelling encountered.
pub fn build_report<I>(listings: I) -> Report
where
    I: IntoIterator<Item = AnnotatedListing>,
{
    let mut groups: BTreeMap<String, ReportGroup> = BTreeMap::new();
    let mut rejections = RejectionTally::default();

    for annotated in listings {
        match annotated.verdict {
            Verdict::RejectedNoVersionFound => rejections.no_version_found += 1,
            Verdict::RejectedIncompatible => rejections.incompatible += 1,
            Verdict::RejectedUnknownModel => rejections.unknown_model += 1,
            Verdict::Accepted => {
                let (Some(model), Some(mention)) = (annotated.resolved_model, annotated.matched_version)
                else {
                    continue;
                };
                groups
                    .entry(group_key(&model))
                    .or_insert_with(|| ReportGroup {
                        model,
                        entries: Vec::new(),
                    })
                    .entries
                    .push(ReportEntry::new(annotated.listing, mention.version));
            }
        }
    }

    let groups = groups
        .into_values()
        .map(|mut group| {
            // stable: equal prices keep encounter order
            group.entries.sort_by_key(ReportEntry::sort_key);
            group
        })
        .collect();

    Report { groups, rejections }
}

fn group_key(model: &str) -> String {
    model
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
