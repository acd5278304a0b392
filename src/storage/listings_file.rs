//! Offline listing input for `jbscrape classify`
//!
//! Accepts a JSON array of listings, or an object with a `listings` array
//! (the layout of older result files). `-` reads from stdin.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Deserialize;

use crate::domain::RawListing;

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingsInput {
    Array(Vec<RawListing>),
    Wrapped { listings: Vec<RawListing> },
}

/// Parses listings from JSON text
pub fn parse_listings(content: &str) -> Result<Vec<RawListing>> {
    let input: ListingsInput = serde_json::from_str(content)
        .context("Expected a JSON array of listings or an object with a \"listings\" array")?;

    Ok(match input {
        ListingsInput::Array(listings) => listings,
        ListingsInput::Wrapped { listings } => listings,
    })
}

/// Reads listings from a file path, or stdin when `source` is `-`
pub fn read_listings(source: &Path) -> Result<Vec<RawListing>> {
    let mut content = String::new();

    if source.as_os_str() == "-" {
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read listings from stdin")?;
    } else {
        let mut file = File::open(source)
            .with_context(|| format!("Failed to open listings file: {}", source.display()))?;

        // Lock is released when file is dropped
        FileExt::lock_shared(&file)
            .context("Failed to acquire read lock on listings file")?;

        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read listings file: {}", source.display()))?;
    }

    parse_listings(&content)
        .with_context(|| format!("Invalid listings input: {}", source.display()))
}
