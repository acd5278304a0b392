//! `jbscrape classify`: run the pipeline over saved listings

use anyhow::Result;

use super::app::ClassifyArgs;
use super::output::Output;
use super::publish::{publish, PublishPlan};
use crate::domain::{build_report, Classifier, CompatibilityTable};
use crate::storage::{read_listings, Config};

pub fn run(output: &Output, mut config: Config, args: ClassifyArgs) -> Result<()> {
    if let Some(path) = args.output {
        config.report.output = path;
    }
    if let Some(max) = args.max_price {
        config.report.max_price = Some(max);
    }
    config.notes.enabled = args.note;
    config.notes.overwrite = args.overwrite_note;
    config.validate()?;

    let listings = read_listings(&args.input)?;
    tracing::debug!(count = listings.len(), input = %args.input.display(), "Read listings");

    let table = CompatibilityTable::standard();
    let classifier = Classifier::new(&table);
    let report = build_report(classifier.classify_all(listings));

    publish(output, report, &PublishPlan::from_config(&config))?;
    Ok(())
}
