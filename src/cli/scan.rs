//! `jbscrape scan`: fetch, classify, report

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use super::app::ScanArgs;
use super::output::Output;
use super::publish::{publish, PublishPlan};
use crate::domain::{build_report, Classifier, CompatibilityTable, SourceSite};
use crate::sources::{collect_listings, EbaySource, HttpFetcher, ListingSource, SwappaSource};
use crate::storage::Config;

/// Command-line flags win over the config file
fn apply_args(config: &mut Config, args: &ScanArgs) {
    if !args.sites.is_empty() {
        config.search.sites = args.sites.clone();
    }
    if let Some(pages) = args.pages {
        config.search.ebay_pages = pages;
    }
    if let Some(delay) = args.delay {
        config.search.delay_secs = delay;
    }
    if let Some(max) = args.max_listings_per_model {
        config.search.swappa_max_listings_per_model = max;
    }
    if let Some(max) = args.max_price {
        config.report.max_price = Some(max);
    }
    if let Some(path) = &args.output {
        config.report.output = path.clone();
    }
    if args.note {
        config.notes.enabled = true;
        config.notes.overwrite = args.overwrite_note;
    }
}

/// Asks for sites and note options, confirming the slow Swappa crawl
fn prompt(config: &mut Config) -> Result<()> {
    let theme = ColorfulTheme::default();

    eprintln!("Searching for jailbreakable versions: iOS 16.0 - 16.6.1, iOS 17.0");

    let choices = [
        "eBay only (~10 min)",
        "Swappa only (slow, ~20 min)",
        "eBay and Swappa (slow, ~30 min)",
    ];
    let choice = Select::with_theme(&theme)
        .with_prompt("Which sites do you want to search?")
        .items(&choices)
        .default(0)
        .interact()
        .context("Failed to read site choice")?;

    let mut sites = match choice {
        1 => vec![SourceSite::Swappa],
        2 => vec![SourceSite::Ebay, SourceSite::Swappa],
        _ => vec![SourceSite::Ebay],
    };

    if sites.contains(&SourceSite::Swappa) {
        let proceed = Confirm::with_theme(&theme)
            .with_prompt("Swappa visits every listing page individually. Continue?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            eprintln!("Falling back to eBay only.");
            sites = vec![SourceSite::Ebay];
        }
    }
    config.search.sites = sites;

    config.notes.enabled = Confirm::with_theme(&theme)
        .with_prompt(format!("Create a note ({})?", config.notes.backend.as_str()))
        .default(true)
        .interact()
        .context("Failed to read note choice")?;

    if config.notes.enabled {
        config.notes.overwrite = Confirm::with_theme(&theme)
            .with_prompt("Overwrite an existing note with the same title?")
            .default(false)
            .interact()
            .context("Failed to read overwrite choice")?;
    }

    Ok(())
}

fn build_sources(config: &Config) -> Result<Vec<Box<dyn ListingSource>>> {
    let settings = config.search.fetch_settings();
    let mut sources: Vec<Box<dyn ListingSource>> = Vec::new();

    for site in &config.search.sites {
        let fetcher = HttpFetcher::new(&settings).context("Failed to build HTTP client")?;
        match site {
            SourceSite::Ebay => {
                sources.push(Box::new(EbaySource::new(fetcher, config.search.ebay_pages)));
            }
            SourceSite::Swappa => sources.push(Box::new(SwappaSource::new(
                fetcher,
                config.search.swappa_max_listings_per_model,
            ))),
        }
    }

    Ok(sources)
}

pub fn run(output: &Output, mut config: Config, args: ScanArgs) -> Result<()> {
    apply_args(&mut config, &args);
    if args.interactive {
        prompt(&mut config)?;
    }
    config.validate()?;

    let sites: Vec<&str> = config.search.sites.iter().map(|s| s.label()).collect();
    output.progress(&format!("Searching {} (this can take several minutes)...", sites.join(" and ")));

    let sources = build_sources(&config)?;
    let collected = collect_listings(&sources);

    for (site, error) in &collected.failed {
        output.warn(&format!("{} skipped: {}", site.label(), error));
    }
    if collected.listings.is_empty() {
        bail!("No listings found on {}", sites.join(" or "));
    }
    tracing::info!(
        listings = collected.listings.len(),
        duplicates = collected.duplicates,
        "Collected listings"
    );

    let table = CompatibilityTable::standard();
    let classifier = Classifier::new(&table);
    let report = build_report(classifier.classify_all(collected.listings));

    publish(output, report, &PublishPlan::from_config(&config))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        let args = ScanArgs {
            sites: vec![SourceSite::Swappa],
            pages: Some(4),
            delay: Some(0.0),
            max_price: Some(300.0),
            output: Some(PathBuf::from("out.json")),
            note: true,
            overwrite_note: true,
            ..ScanArgs::default()
        };

        apply_args(&mut config, &args);
        assert_eq!(config.search.sites, vec![SourceSite::Swappa]);
        assert_eq!(config.search.ebay_pages, 4);
        assert_eq!(config.max_price_cents(), Some(30000));
        assert_eq!(config.report.output, PathBuf::from("out.json"));
        assert!(config.notes.enabled && config.notes.overwrite);
    }

    #[test]
    fn unset_flags_keep_config() {
        let mut config = Config::default();
        config.search.sites = vec![SourceSite::Ebay, SourceSite::Swappa];
        config.notes.enabled = true;

        apply_args(&mut config, &ScanArgs::default());
        assert_eq!(config.search.sites.len(), 2);
        assert_eq!(config.search.ebay_pages, 2);
        assert!(config.notes.enabled);
    }

    #[test]
    fn one_source_per_site() {
        let mut config = Config::default();
        config.search.sites = vec![SourceSite::Ebay, SourceSite::Swappa];
        let sources = build_sources(&config).unwrap();
        let sites: Vec<_> = sources.iter().map(|s| s.site()).collect();
        assert_eq!(sites, vec![SourceSite::Ebay, SourceSite::Swappa]);
    }
}
