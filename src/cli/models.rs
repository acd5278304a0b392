//! `jbscrape models`: print the compatibility table

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use crate::domain::{CompatibilityRule, CompatibilityTable};

#[derive(Serialize)]
struct ModelRow<'a> {
    model: &'a str,
    first_supported: String,
    last_major: u16,
    jailbreakable: Vec<String>,
}

impl<'a> From<&'a CompatibilityRule> for ModelRow<'a> {
    fn from(rule: &'a CompatibilityRule) -> Self {
        Self {
            model: rule.model,
            first_supported: rule.first_supported.to_string(),
            last_major: rule.last_major,
            jailbreakable: rule.allowed.iter().map(|r| r.to_string()).collect(),
        }
    }
}

pub fn run(output: &Output) -> Result<()> {
    let table = CompatibilityTable::standard();
    let rows: Vec<ModelRow> = table.rules().iter().map(ModelRow::from).collect();

    if output.is_json() {
        output.data(&serde_json::json!({
            "jailbreakable_ranges": table
                .jailbreakable_ranges()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
            "models": rows,
        }));
        return Ok(());
    }

    let ranges: Vec<String> = table.jailbreakable_ranges().iter().map(|r| r.to_string()).collect();
    println!("Jailbreakable iOS: {}", ranges.join(", "));
    println!();
    println!("{:<20} {:<18} JAILBREAKABLE", "MODEL", "SUPPORTED IOS");
    println!("{}", "-".repeat(60));
    for row in rows {
        let supported = format!("{} - {}.x", row.first_supported, row.last_major);
        let jailbreakable = if row.jailbreakable.is_empty() {
            "-".to_string()
        } else {
            row.jailbreakable.join(", ")
        };
        println!("{:<20} {:<18} {}", row.model, supported, jailbreakable);
    }

    Ok(())
}
