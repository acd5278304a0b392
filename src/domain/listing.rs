//! Raw marketplace listings
//!
//! A [`RawListing`] is what a source adapter hands to the classifier: plain
//! text fields, no HTML. Listings are immutable once built.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::price::{self, Price};

/// Marketplace a listing was scraped from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceSite {
    Ebay,
    Swappa,
}

impl SourceSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSite::Ebay => "ebay",
            SourceSite::Swappa => "swappa",
        }
    }

    /// Human-facing name
    pub fn label(&self) -> &'static str {
        match self {
            SourceSite::Ebay => "eBay",
            SourceSite::Swappa => "Swappa",
        }
    }
}

impl fmt::Display for SourceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single marketplace advertisement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,

    /// Seller-written description. Never contains buyer questions or comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "price::lenient")]
    pub price: Option<Price>,

    #[serde(rename = "url")]
    pub source_url: String,

    #[serde(rename = "site", alias = "source")]
    pub source_site: SourceSite,

    /// Model as declared by the marketplace (category or URL slug)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_model: Option<String>,

    /// Marketplace listing identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl RawListing {
    pub fn new(site: SourceSite, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            price: None,
            source_url: url.into(),
            source_site: site,
            declared_model: None,
            item_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: Option<Price>) -> Self {
        self.price = price;
        self
    }

    pub fn with_declared_model(mut self, model: impl Into<String>) -> Self {
        self.declared_model = Some(model.into());
        self
    }

    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    /// The text that may be searched for iOS versions
    ///
    /// eBay search results only expose titles. On Swappa only the seller's
    /// description counts; the listing title is the marketplace's own label.
    pub fn scan_text(&self) -> &str {
        match self.source_site {
            SourceSite::Ebay => &self.title,
            SourceSite::Swappa => self.description.as_deref().unwrap_or(""),
        }
    }

    /// Stable identity used to drop the same listing returned by several searches
    pub fn fingerprint(&self) -> String {
        let identity = self.item_id.as_deref().unwrap_or(&self.source_url);
        let input = format!("{}:{}", self.source_site, identity);
        let hash = blake3::hash(input.as_bytes());
        hash.to_hex()[..16].to_string()
    }
}
