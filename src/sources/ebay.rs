//! eBay search adapter
//!
//! Searches used phones (category 9355, condition 3000) once per jailbreakable
//! iOS release and reads the result cards. eBay result pages carry no
//! description, so each listing is title + price + link.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::http::PageFetcher;
use super::{Attempts, ListingSource, SourceError};
use crate::domain::{Price, RawListing, SourceSite};

const SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";
const CELL_PHONES_CATEGORY: &str = "9355";
const USED_CONDITION: &str = "3000";

/// Public iOS releases inside the jailbreakable ranges
const JAILBREAKABLE_RELEASES: &[&str] = &[
    "16", "16.0", "16.0.1", "16.0.2", "16.0.3", "16.1", "16.1.1", "16.1.2", "16.2", "16.2.1",
    "16.3", "16.3.1", "16.4", "16.4.1", "16.5", "16.5.1", "16.6", "16.6.1", "17", "17.0",
];

const CARD_SELECTORS: &[&str] = &["li[data-listingid]", ".srp-results li.s-item", ".srp-list > li.s-card"];
const TITLE_SELECTORS: &[&str] = &[".s-card__title", ".s-item__title", "[class*=\"title\"]", "h3"];
const PRICE_SELECTORS: &[&str] = &[".s-card__price", ".s-item__price", "[class*=\"price\"]"];
const LINK_SELECTOR: &str = "a[href*=\"/itm/\"]";

static ITEM_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/itm/(?:[^/?#]+/)?(\d{6,})").unwrap());

/// Search phrases, one per release, plus unquoted forms for bare majors
pub fn search_queries() -> Vec<String> {
    let mut queries = Vec::new();
    for release in JAILBREAKABLE_RELEASES {
        queries.push(format!("iPhone \"iOS {release}\""));
        if !release.contains('.') {
            queries.push(format!("iPhone iOS {release}"));
        }
    }
    queries
}

pub fn search_url(query: &str, page: u32) -> Result<Url, SourceError> {
    let page = page.to_string();
    Url::parse_with_params(
        SEARCH_URL,
        &[
            ("_nkw", query),
            ("_sacat", CELL_PHONES_CATEGORY),
            ("LH_ItemCondition", USED_CONDITION),
            ("_pgn", page.as_str()),
        ],
    )
    .map_err(|e| SourceError::Url(e.to_string()))
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|_| SourceError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the result cards of one search page
pub fn parse_search_results(html: &str) -> Result<Vec<RawListing>, SourceError> {
    let document = Html::parse_document(html);

    let mut cards = Vec::new();
    for css in CARD_SELECTORS {
        cards = document.select(&selector(css)?).collect();
        if !cards.is_empty() {
            break;
        }
    }

    let title_selectors = TITLE_SELECTORS.iter().map(|css| selector(css)).collect::<Result<Vec<_>, _>>()?;
    let price_selectors = PRICE_SELECTORS.iter().map(|css| selector(css)).collect::<Result<Vec<_>, _>>()?;
    let link_selector = selector(LINK_SELECTOR)?;

    let mut listings = Vec::new();
    for card in cards {
        let href = card
            .select(&link_selector)
            .filter_map(|a| a.value().attr("href"))
            .next();
        let item_id = card
            .value()
            .attr("data-listingid")
            .map(str::to_string)
            .or_else(|| href.and_then(|h| ITEM_ID.captures(h)).map(|c| c[1].to_string()));

        let url = match (&item_id, href) {
            (Some(id), _) => format!("https://www.ebay.com/itm/{id}"),
            (None, Some(href)) => href.to_string(),
            (None, None) => continue,
        };

        let Some(title) = title_selectors.iter().find_map(|sel| {
            card.select(sel)
                .map(element_text)
                .map(|t| clean_title(&t))
                .find(|t| t.len() > 5)
        }) else {
            continue;
        };
        if title.eq_ignore_ascii_case("Shop on eBay") {
            continue;
        }

        let price = price_selectors.iter().find_map(|sel| {
            card.select(sel)
                .map(element_text)
                .find(|t| t.contains('$') || t.contains('£') || t.contains('€'))
        });

        let mut listing = RawListing::new(SourceSite::Ebay, title, url)
            .with_price(price.as_deref().and_then(Price::parse));
        if let Some(id) = item_id {
            listing = listing.with_item_id(id);
        }
        listings.push(listing);
    }

    Ok(listings)
}

/// Strips eBay's accessibility and badge text from a card title
fn clean_title(raw: &str) -> String {
    let mut title = raw.trim();
    for prefix in ["New Listing", "NEW LISTING", "Sponsored"] {
        title = title.strip_prefix(prefix).unwrap_or(title).trim_start();
    }
    for suffix in ["Opens in a new window or tab"] {
        title = title.strip_suffix(suffix).unwrap_or(title).trim_end();
    }
    title.to_string()
}

/// eBay as a [`ListingSource`]
pub struct EbaySource<F> {
    fetcher: F,
    pages: u32,
    queries: Vec<String>,
}

impl<F: PageFetcher> EbaySource<F> {
    pub fn new(fetcher: F, pages: u32) -> Self {
        Self {
            fetcher,
            pages,
            queries: search_queries(),
        }
    }

    /// Replaces the default search phrases
    pub fn with_queries(mut self, queries: Vec<String>) -> Self {
        self.queries = queries;
        self
    }
}

impl<F: PageFetcher> ListingSource for EbaySource<F> {
    fn site(&self) -> SourceSite {
        SourceSite::Ebay
    }

    fn fetch_listings(&self) -> Result<Vec<RawListing>, SourceError> {
        let mut attempts = Attempts::new(SourceSite::Ebay);
        let mut listings = Vec::new();
        let total = self.queries.len();

        for (i, query) in self.queries.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, total, query);
            let mut found = 0;

            for page in 1..=self.pages {
                let url = search_url(query, page)?;
                let html = match self.fetcher.get_html(url.as_str()) {
                    Ok(html) => {
                        attempts.succeeded();
                        html
                    }
                    Err(e) => {
                        tracing::warn!(query = %query, page, error = %e, "Search page failed");
                        attempts.failed(&e);
                        break;
                    }
                };

                let results = match parse_search_results(&html) {
                    Ok(results) => results,
                    Err(e) => {
                        tracing::warn!(query = %query, page, error = %e, "Could not parse search page");
                        break;
                    }
                };
                if results.is_empty() {
                    break;
                }
                found += results.len();
                listings.extend(results);
                self.fetcher.pause();
            }

            tracing::debug!(query = %query, found, "Query finished");
        }

        attempts.finish(listings)
    }
}
