//! `jbscrape check`: one model/version question

use anyhow::{Context, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::{CompatibilityTable, IosVersion};

#[derive(Debug, Serialize)]
struct CheckResult {
    model: String,
    resolved_model: Option<&'static str>,
    version: IosVersion,
    jailbreakable: bool,
    /// The version has a public jailbreak on some device
    in_jailbreakable_range: bool,
    /// None when the model is unknown
    device_can_run: Option<bool>,
    allowed: Vec<String>,
}

fn evaluate(table: &CompatibilityTable, model: &str, version: IosVersion) -> CheckResult {
    let rule = table.lookup(model).or_else(|| table.infer_model(model));

    CheckResult {
        model: model.to_string(),
        resolved_model: rule.map(|r| r.model),
        version,
        jailbreakable: rule.is_some_and(|r| r.allows(version)),
        in_jailbreakable_range: table.in_jailbreakable_range(version),
        device_can_run: rule.map(|r| r.can_run(version)),
        allowed: rule
            .map(|r| r.allowed.iter().map(|range| range.to_string()).collect())
            .unwrap_or_default(),
    }
}

pub fn run(output: &Output, model: &str, version: &str) -> Result<()> {
    let version: IosVersion = version.parse().context("Invalid version argument")?;
    let table = CompatibilityTable::standard();
    let result = evaluate(&table, model, version);

    if output.is_json() {
        output.data(&result);
        return Ok(());
    }

    let Some(resolved) = result.resolved_model else {
        println!("Unknown model '{}'. Run `jbscrape models` for the supported list.", model);
        println!("iOS {}: not jailbreakable (unknown devices are never assumed compatible)", version);
        return Ok(());
    };

    if result.jailbreakable {
        println!("{} on iOS {}: jailbreakable", resolved, version);
    } else if !result.in_jailbreakable_range {
        println!("{} on iOS {}: not jailbreakable (no public jailbreak for iOS {})", resolved, version, version);
    } else {
        println!("{} on iOS {}: not jailbreakable ({} never ran iOS {})", resolved, version, resolved, version);
    }

    if result.allowed.is_empty() {
        println!("Jailbreakable versions for {}: none", resolved);
    } else {
        println!("Jailbreakable versions for {}: iOS {}", resolved, result.allowed.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(model: &str, version: &str) -> CheckResult {
        evaluate(&CompatibilityTable::standard(), model, version.parse().unwrap())
    }

    #[test]
    fn compatible_pair() {
        let result = check("iPhone 14", "16.5");
        assert!(result.jailbreakable);
        assert_eq!(result.resolved_model, Some("iPhone 14"));
        assert_eq!(result.device_can_run, Some(true));
    }

    #[test]
    fn device_too_old() {
        let result = check("iPhone 6", "16.5");
        assert!(!result.jailbreakable);
        assert!(result.in_jailbreakable_range);
        assert_eq!(result.device_can_run, Some(false));
        assert!(result.allowed.is_empty());
    }

    #[test]
    fn version_not_jailbreakable() {
        let result = check("iPhone 14", "15.7");
        assert!(!result.jailbreakable);
        assert!(!result.in_jailbreakable_range);
        assert_eq!(result.allowed, vec!["16.0-16.6.1", "17.0"]);
    }

    #[test]
    fn model_inferred_from_loose_text() {
        let result = check("Apple iPhone 13 Pro Max 256GB", "iOS 16.1.2");
        assert_eq!(result.resolved_model, Some("iPhone 13 Pro Max"));
        assert!(result.jailbreakable);
    }

    #[test]
    fn unknown_model() {
        let result = check("Galaxy S23", "16.5");
        assert!(!result.jailbreakable);
        assert_eq!(result.resolved_model, None);
        assert_eq!(result.device_can_run, None);
    }
}
