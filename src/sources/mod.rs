//! # Marketplace Sources
//!
//! Adapters that turn marketplace pages into [`RawListing`]s.
//!
//! | Site | Strategy | Text handed to the classifier |
//! |------|----------|-------------------------------|
//! | eBay | One search per jailbreakable version, N result pages each | Result card title |
//! | Swappa | Listing index per model, then each listing page | Seller description only |
//!
//! Swappa pages also carry buyer questions ("does this run iOS 16?"). Those
//! are never read: the description is assembled from the JSON-LD product
//! description and the "Damage Description" section only.
//!
//! ## Failure policy
//!
//! A failed page or listing is logged and skipped. A source reports an error
//! only when every request it made failed, and [`collect_listings`] carries on
//! with the remaining sources.

mod ebay;
mod http;
mod swappa;

use std::collections::HashSet;

use thiserror::Error;

use crate::domain::{RawListing, SourceSite};

pub use ebay::{parse_search_results, search_queries, search_url, EbaySource};
pub use http::{FetchSettings, HttpFetcher, PageFetcher};
pub use swappa::{listing_links, parse_listing_page, SwappaSource, SWAPPA_MODEL_SLUGS};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Blocked by site: {0}")]
    Blocked(String),

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("{site} unreachable: all {attempts} requests failed (last: {last})")]
    Unreachable {
        site: SourceSite,
        attempts: usize,
        last: String,
    },
}

/// A marketplace that can produce listings
pub trait ListingSource {
    fn site(&self) -> SourceSite;

    fn fetch_listings(&self) -> Result<Vec<RawListing>, SourceError>;
}

/// Listings gathered from several sources
#[derive(Debug, Default)]
pub struct Collected {
    pub listings: Vec<RawListing>,
    pub failed: Vec<(SourceSite, SourceError)>,
    pub duplicates: usize,
}

/// Runs every source in order, dropping listings already seen
pub fn collect_listings(sources: &[Box<dyn ListingSource>]) -> Collected {
    let mut collected = Collected::default();
    let mut seen = HashSet::new();

    for source in sources {
        let site = source.site();
        tracing::info!(site = %site, "Searching {}", site.label());

        match source.fetch_listings() {
            Ok(listings) => {
                let before = collected.listings.len();
                for listing in listings {
                    if seen.insert(listing.fingerprint()) {
                        collected.listings.push(listing);
                    } else {
                        collected.duplicates += 1;
                    }
                }
                tracing::info!(
                    site = %site,
                    count = collected.listings.len() - before,
                    "{} total: {} unique listings",
                    site.label(),
                    collected.listings.len() - before
                );
            }
            Err(e) => {
                tracing::warn!(site = %site, error = %e, "Source failed, continuing without it");
                collected.failed.push((site, e));
            }
        }
    }

    collected
}

/// Tracks request outcomes so a source can tell "nothing found" from "unreachable"
#[derive(Debug)]
pub(crate) struct Attempts {
    site: SourceSite,
    made: usize,
    failed: usize,
    last_error: Option<String>,
}

impl Attempts {
    pub(crate) fn new(site: SourceSite) -> Self {
        Self {
            site,
            made: 0,
            failed: 0,
            last_error: None,
        }
    }

    pub(crate) fn succeeded(&mut self) {
        self.made += 1;
    }

    pub(crate) fn failed(&mut self, error: &SourceError) {
        self.made += 1;
        self.failed += 1;
        self.last_error = Some(error.to_string());
    }

    /// Err when at least one request was made and none succeeded
    pub(crate) fn finish<T>(self, value: T) -> Result<T, SourceError> {
        if self.made > 0 && self.failed == self.made {
            return Err(SourceError::Unreachable {
                site: self.site,
                attempts: self.made,
                last: self.last_error.unwrap_or_default(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(SourceSite, Vec<RawListing>);

    impl ListingSource for Fixed {
        fn site(&self) -> SourceSite {
            self.0
        }

        fn fetch_listings(&self) -> Result<Vec<RawListing>, SourceError> {
            Ok(self.1.clone())
        }
    }

    struct Down(SourceSite);

    impl ListingSource for Down {
        fn site(&self) -> SourceSite {
            self.0
        }

        fn fetch_listings(&self) -> Result<Vec<RawListing>, SourceError> {
            Err(SourceError::Network("connection refused".to_string()))
        }
    }

    fn listing(site: SourceSite, id: &str) -> RawListing {
        RawListing::new(site, format!("iPhone 13 #{id}"), format!("https://example.test/{id}"))
            .with_item_id(id)
    }

    #[test]
    fn duplicates_are_dropped() {
        let sources: Vec<Box<dyn ListingSource>> = vec![
            Box::new(Fixed(
                SourceSite::Ebay,
                vec![listing(SourceSite::Ebay, "1"), listing(SourceSite::Ebay, "1")],
            )),
            Box::new(Fixed(SourceSite::Swappa, vec![listing(SourceSite::Swappa, "1")])),
        ];

        let collected = collect_listings(&sources);
        assert_eq!(collected.listings.len(), 2);
        assert_eq!(collected.duplicates, 1);
    }

    #[test]
    fn failed_source_does_not_stop_others() {
        let sources: Vec<Box<dyn ListingSource>> = vec![
            Box::new(Down(SourceSite::Ebay)),
            Box::new(Fixed(SourceSite::Swappa, vec![listing(SourceSite::Swappa, "9")])),
        ];

        let collected = collect_listings(&sources);
        assert_eq!(collected.listings.len(), 1);
        assert_eq!(collected.failed.len(), 1);
        assert_eq!(collected.failed[0].0, SourceSite::Ebay);
    }

    #[test]
    fn attempts_all_failed_is_unreachable() {
        let mut attempts = Attempts::new(SourceSite::Ebay);
        attempts.failed(&SourceError::Network("timeout".to_string()));
        attempts.failed(&SourceError::Blocked("captcha".to_string()));
        let err = attempts.finish(()).unwrap_err();
        assert!(matches!(err, SourceError::Unreachable { attempts: 2, .. }));
    }

    #[test]
    fn attempts_partial_failure_is_ok() {
        let mut attempts = Attempts::new(SourceSite::Swappa);
        attempts.failed(&SourceError::Network("timeout".to_string()));
        attempts.succeeded();
        assert!(attempts.finish(vec![1]).is_ok());

        assert!(Attempts::new(SourceSite::Swappa).finish(()).is_ok());
    }
}
