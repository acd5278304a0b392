//! Listing classification
//!
//! Decides whether a listing plausibly advertises a jailbreakable device:
//!
//! 1. Resolve the model (declared model, else inferred from the title).
//! 2. Extract iOS versions from the site-specific text scope.
//! 3. Accept the first mention the model can run within the jailbreakable range.

use serde::Serialize;

use super::compat::CompatibilityTable;
use super::listing::RawListing;
use super::version::{mentions, VersionMention};

/// Outcome of classifying one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    RejectedNoVersionFound,
    RejectedIncompatible,
    RejectedUnknownModel,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::RejectedNoVersionFound => "no version found",
            Verdict::RejectedIncompatible => "incompatible",
            Verdict::RejectedUnknownModel => "unknown model",
        }
    }
}

/// A listing with its classification
///
/// When the verdict is [`Verdict::Accepted`], `resolved_model` and
/// `matched_version` are always present and the version is jailbreakable on
/// that model. For [`Verdict::RejectedIncompatible`] the first mention is kept
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedListing {
    pub listing: RawListing,
    pub resolved_model: Option<String>,
    pub matched_version: Option<VersionMention>,
    pub verdict: Verdict,
}

/// Classifies listings against a compatibility table
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'t> {
    table: &'t CompatibilityTable,
}

impl<'t> Classifier<'t> {
    pub fn new(table: &'t CompatibilityTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, listing: RawListing) -> AnnotatedListing {
        let rule = listing
            .declared_model
            .as_deref()
            .and_then(|declared| {
                self.table
                    .lookup(declared)
                    .or_else(|| self.table.infer_model(declared))
            })
            .or_else(|| self.table.infer_model(&listing.title));

        let Some(rule) = rule else {
            return AnnotatedListing {
                listing,
                resolved_model: None,
                matched_version: None,
                verdict: Verdict::RejectedUnknownModel,
            };
        };

        let mut first = None;
        let mut accepted = None;
        for mention in mentions(listing.scan_text()) {
            if rule.allows(mention.version) {
                accepted = Some(mention);
                break;
            }
            if first.is_none() {
                first = Some(mention);
            }
        }

        let (matched_version, verdict) = match (accepted, first) {
            (Some(mention), _) => (Some(mention), Verdict::Accepted),
            (None, Some(mention)) => (Some(mention), Verdict::RejectedIncompatible),
            (None, None) => (None, Verdict::RejectedNoVersionFound),
        };

        AnnotatedListing {
            listing,
            resolved_model: Some(rule.model.to_string()),
            matched_version,
            verdict,
        }
    }

    pub fn classify_all<I>(&self, listings: I) -> Vec<AnnotatedListing>
    where
        I: IntoIterator<Item = RawListing>,
    {
        listings.into_iter().map(|l| self.classify(l)).collect()
    }
}
