//! Swappa adapter
//!
//! Swappa has no usable search, so each supported model's listing index is
//! read and every listing page visited. Only seller-written text becomes the
//! description: the JSON-LD product description and the "Damage Description"
//! section. Buyer questions and comments further down the page are ignored.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use super::http::PageFetcher;
use super::{Attempts, ListingSource, SourceError};
use crate::domain::{Price, RawListing, SourceSite};

const BASE_URL: &str = "https://swappa.com";

/// Listing index slugs, newest first
pub const SWAPPA_MODEL_SLUGS: &[&str] = &[
    "apple-iphone-15-pro-max",
    "apple-iphone-15-pro",
    "apple-iphone-15-plus",
    "apple-iphone-15",
    "apple-iphone-14-pro-max",
    "apple-iphone-14-pro",
    "apple-iphone-14-plus",
    "apple-iphone-14",
    "apple-iphone-13-pro-max",
    "apple-iphone-13-pro",
    "apple-iphone-13-mini",
    "apple-iphone-13",
    "apple-iphone-12-pro-max",
    "apple-iphone-12-pro",
    "apple-iphone-12-mini",
    "apple-iphone-12",
    "apple-iphone-11-pro-max",
    "apple-iphone-11-pro",
    "apple-iphone-11",
    "apple-iphone-xs-max",
    "apple-iphone-xs",
    "apple-iphone-xr",
    "apple-iphone-x",
    "apple-iphone-se-3rd-gen",
    "apple-iphone-se-2nd-gen",
    "apple-iphone-8-plus",
    "apple-iphone-8",
];

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|_| SourceError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn index_url(slug: &str) -> String {
    format!("{BASE_URL}/listings/{slug}")
}

/// Listing ids and canonical URLs on a model index page, in page order, without repeats
pub fn listing_links(html: &str) -> Result<Vec<(String, String)>, SourceError> {
    let document = Html::parse_document(html);
    let base = Url::parse(BASE_URL).map_err(|e| SourceError::Url(e.to_string()))?;
    let links = selector("a[href*=\"/listing/view/\"]")?;

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for href in document.select(&links).filter_map(|a| a.value().attr("href")) {
        let Ok(url) = base.join(href) else {
            tracing::debug!(href, "Skipping unparseable listing link");
            continue;
        };

        let Some(id) = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string)
        else {
            continue;
        };
        if seen.insert(id.clone()) {
            let canonical = format!("{BASE_URL}/listing/view/{id}");
            found.push((id, canonical));
        }
    }

    Ok(found)
}

/// Builds a listing from a Swappa listing page
///
/// The slug becomes the declared model. The description is `None` when the
/// page carries no seller text at all.
pub fn parse_listing_page(html: &str, id: &str, url: &str, slug: &str) -> Result<RawListing, SourceError> {
    let document = Html::parse_document(html);

    let mut parts = Vec::new();

    let ld_json = selector("script[type=\"application/ld+json\"]")?;
    for script in document.select(&ld_json) {
        let content: String = script.text().collect();
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => collect_descriptions(&value, &mut parts),
            Err(e) => tracing::debug!(id, error = %e, "Ignoring malformed JSON-LD block"),
        }
    }

    let headings = selector("h3")?;
    let damage = document
        .select(&headings)
        .find(|h| element_text(*h).contains("Damage Description"))
        .and_then(|h| {
            h.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "div")
        })
        .map(element_text)
        .filter(|text| !text.is_empty());
    parts.extend(damage);

    let title = document
        .select(&selector("h1")?)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| slug.replace('-', " "));

    let price = document.select(&selector("[itemprop=\"price\"]")?).next().and_then(|el| {
        match el.value().attr("content") {
            Some(content) => Price::parse(content),
            None => Price::parse(&element_text(el)),
        }
    });

    let mut listing = RawListing::new(SourceSite::Swappa, title, url)
        .with_item_id(id)
        .with_declared_model(slug)
        .with_price(price);
    if !parts.is_empty() {
        listing = listing.with_description(parts.join(" "));
    }

    Ok(listing)
}

/// Gathers the `description` of every `Product` node, descending into `@graph`
/// and nested objects
///
/// Organization, offer and breadcrumb nodes carry marketplace text, not the
/// seller's, and are never read.
fn collect_descriptions(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if is_product(map.get("@type")) {
                if let Some(Value::String(text)) = map.get("description") {
                    let text = text.trim();
                    if !text.is_empty() && !out.iter().any(|seen| seen == text) {
                        out.push(text.to_string());
                    }
                }
            }
            for (key, v) in map {
                if key != "description" {
                    collect_descriptions(v, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_descriptions(item, out);
            }
        }
        _ => {}
    }
}

/// `@type` may be a single name or a list of names
fn is_product(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(name)) => name == "Product",
        Some(Value::Array(names)) => names.iter().any(|n| n.as_str() == Some("Product")),
        _ => false,
    }
}

/// Swappa as a [`ListingSource`]
pub struct SwappaSource<F> {
    fetcher: F,
    max_per_model: usize,
    slugs: Vec<String>,
}

impl<F: PageFetcher> SwappaSource<F> {
    pub fn new(fetcher: F, max_per_model: usize) -> Self {
        Self {
            fetcher,
            max_per_model,
            slugs: SWAPPA_MODEL_SLUGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Restricts the models whose indexes are read
    pub fn with_slugs(mut self, slugs: Vec<String>) -> Self {
        self.slugs = slugs;
        self
    }
}

impl<F: PageFetcher> ListingSource for SwappaSource<F> {
    fn site(&self) -> SourceSite {
        SourceSite::Swappa
    }

    fn fetch_listings(&self) -> Result<Vec<RawListing>, SourceError> {
        let mut attempts = Attempts::new(SourceSite::Swappa);
        let mut seen_ids = HashSet::new();
        let mut listings = Vec::new();
        let total = self.slugs.len();

        for (i, slug) in self.slugs.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, total, slug);

            let index = match self.fetcher.get_html(&index_url(slug)) {
                Ok(html) => {
                    attempts.succeeded();
                    html
                }
                Err(e) => {
                    tracing::warn!(slug = %slug, error = %e, "Listing index failed");
                    attempts.failed(&e);
                    continue;
                }
            };
            self.fetcher.pause();

            let links: Vec<_> = listing_links(&index)?
                .into_iter()
                .filter(|(id, _)| seen_ids.insert(id.clone()))
                .take(self.max_per_model)
                .collect();
            tracing::debug!(slug = %slug, count = links.len(), "Listing links");

            for (id, url) in links {
                let page = match self.fetcher.get_html(&url) {
                    Ok(html) => {
                        attempts.succeeded();
                        html
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Listing page failed");
                        attempts.failed(&e);
                        continue;
                    }
                };
                listings.push(parse_listing_page(&page, &id, &url, slug)?);
                self.fetcher.pause();
            }
        }

        attempts.finish(listings)
    }
}
