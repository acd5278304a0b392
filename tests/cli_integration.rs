//! CLI integration tests for jbscrape
//!
//! Everything here runs offline: `classify` drives the full pipeline from a
//! listings file, `check` and `models` only read the built-in table.

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LISTINGS: &str = r#"[
  {"title": "Apple iPhone 13 128GB Unlocked iOS 16.5", "price": "$200.00",
   "url": "https://www.ebay.com/itm/100000000001", "site": "ebay", "item_id": "100000000001"},
  {"title": "iPhone 13 Pro iOS 16.1.2 Graphite", "price": "$410.00",
   "url": "https://www.ebay.com/itm/100000000002", "site": "ebay", "item_id": "100000000002"},
  {"title": "iPhone 13 jailbroken iOS 16.0", "price": null,
   "url": "https://www.ebay.com/itm/100000000003", "site": "ebay", "item_id": "100000000003"},
  {"title": "iPhone 13 256GB iOS 16.5", "price": "$150.00",
   "url": "https://www.ebay.com/itm/100000000004", "site": "ebay", "item_id": "100000000004"},
  {"title": "iPhone 6 64GB iOS 16.5", "price": "$40.00",
   "url": "https://www.ebay.com/itm/100000000005", "site": "ebay"},
  {"title": "iPhone 14 Pro Max iOS 15.7", "price": "$700.00",
   "url": "https://www.ebay.com/itm/100000000006", "site": "ebay"},
  {"title": "Samsung Galaxy S23 running 16.5", "price": "$300.00",
   "url": "https://www.ebay.com/itm/100000000007", "site": "ebay"},
  {"title": "Apple iPhone 12 - Unlocked - 64 GB", "price": "$220",
   "url": "https://swappa.com/listing/view/LAAA11111", "site": "swappa",
   "declared_model": "apple-iphone-12", "item_id": "LAAA11111"},
  {"title": "iPhone 11 64GB great condition", "price": "$180.00",
   "url": "https://www.ebay.com/itm/100000000009", "site": "ebay"}
]"#;

/// Get a command instance for the jbscrape binary, isolated from user config
fn jb_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("jbscrape"));
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("JBSCRAPE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Temp dir containing `listings.json`
fn setup_listings() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listings.json");
    fs::write(&path, LISTINGS).unwrap();
    (dir, path)
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap()
}

// =============================================================================
// Classify Tests
// =============================================================================

#[test]
fn test_classify_text_summary() {
    let (dir, input) = setup_listings();

    jb_cmd(dir.path())
        .arg("classify")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("RESULTS: 4 listings"))
        .stdout(predicate::str::contains("iPhone 13 (3)"))
        .stdout(predicate::str::contains("iPhone 13 Pro (1)"))
        .stdout(predicate::str::contains("[JB]"))
        .stdout(predicate::str::contains("Saved 4 listings to jbscrape_results.json"));

    assert!(dir.path().join("jbscrape_results.json").is_file());
}

#[test]
fn test_classify_json_groups_and_order() {
    let (dir, input) = setup_listings();

    let assert = jb_cmd(dir.path())
        .args(["classify", "--format", "json"])
        .arg(&input)
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    assert_eq!(report["total_count"], 4);

    let groups = report["groups"].as_array().unwrap();
    let models: Vec<_> = groups.iter().map(|g| g["model"].as_str().unwrap()).collect();
    assert_eq!(models, vec!["iPhone 13", "iPhone 13 Pro"]);

    let prices: Vec<_> = groups[0]["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["price"].clone())
        .collect();
    assert_eq!(prices, vec![Value::from("$150.00"), Value::from("$200.00"), Value::Null]);

    assert_eq!(report["rejections"]["no_version_found"], 2);
    assert_eq!(report["rejections"]["incompatible"], 2);
    assert_eq!(report["rejections"]["unknown_model"], 1);
}

#[test]
fn test_classify_writes_output_file() {
    let (dir, input) = setup_listings();
    let out = dir.path().join("reports").join("run.json");

    let assert = jb_cmd(dir.path())
        .args(["classify", "--format", "json", "-o"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success();

    let printed = stdout_json(assert.get_output());
    let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(printed, written);
    assert!(!dir.path().join("jbscrape_results.json").exists());
}

#[test]
fn test_classify_empty_input_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.json");
    fs::write(&input, "[]").unwrap();

    let assert = jb_cmd(dir.path())
        .args(["classify", "--format", "json"])
        .arg(&input)
        .assert()
        .success();

    let report = stdout_json(assert.get_output());
    assert_eq!(report["total_count"], 0);
    assert_eq!(report["groups"], serde_json::json!([]));
}

#[test]
fn test_classify_reads_stdin() {
    let dir = TempDir::new().unwrap();

    let assert = jb_cmd(dir.path())
        .args(["classify", "-", "--format", "json"])
        .write_stdin(LISTINGS)
        .assert()
        .success();

    assert_eq!(stdout_json(assert.get_output())["total_count"], 4);
}

#[test]
fn test_classify_price_ceiling_keeps_unpriced() {
    let (dir, input) = setup_listings();

    let assert = jb_cmd(dir.path())
        .args(["classify", "--format", "json", "--max-price", "175"])
        .arg(&input)
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    assert_eq!(report["total_count"], 2);
    let groups = report["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["listings"][0]["price_value"], 150.0);
    assert!(groups[0]["listings"][1]["price"].is_null());
}

#[test]
fn test_classify_invalid_input_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, "{\"not\": \"listings\"}").unwrap();

    jb_cmd(dir.path())
        .arg("classify")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("Invalid listings input"));
}

#[test]
fn test_classify_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .args(["classify", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open listings file"));
}

#[test]
fn test_classify_unwritable_output_fails() {
    let (dir, input) = setup_listings();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();

    jb_cmd(dir.path())
        .arg("classify")
        .arg(&input)
        .arg("-o")
        .arg(blocker.join("out.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to write report"));
}

// =============================================================================
// Notes Tests
// =============================================================================

#[test]
fn test_classify_markdown_note() {
    let (dir, input) = setup_listings();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        "[notes]\nbackend = \"markdown\"\ndir = \"notes\"\ntitle = \"JB Finds\"\n",
    )
    .unwrap();

    jb_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["classify", "--note"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created note:"));

    let note = fs::read_to_string(dir.path().join("notes").join("jb-finds.md")).unwrap();
    assert!(note.starts_with("---\n"));
    assert!(note.contains("## iPhone 13 (3)"));
    assert!(note.contains("Generated by jbscrape"));
}

#[test]
fn test_note_failure_is_not_fatal() {
    let (dir, input) = setup_listings();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[notes]\nbackend = \"markdown\"\ndir = {:?}\n",
            blocker.join("notes").display().to_string()
        ),
    )
    .unwrap();

    jb_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["classify", "--note"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not create note"));

    assert!(dir.path().join("jbscrape_results.json").is_file());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_invalid_config_fails() {
    let (dir, input) = setup_listings();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[search]\nebay_pages = \"many\"\n").unwrap();

    jb_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("classify")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_config_from_env() {
    let (dir, input) = setup_listings();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[report]\noutput = \"from-env.json\"\n").unwrap();

    jb_cmd(dir.path())
        .env("JBSCRAPE_CONFIG", &config)
        .arg("classify")
        .arg(&input)
        .assert()
        .success();

    assert!(dir.path().join("from-env.json").is_file());
}

// =============================================================================
// Check and Models Tests
// =============================================================================

#[test]
fn test_check_compatible() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .args(["check", "iPhone 14", "16.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("iPhone 14 on iOS 16.5: jailbreakable"));
}

#[test]
fn test_check_device_too_old() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .args(["check", "iPhone 6", "16.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not jailbreakable"))
        .stdout(predicate::str::contains("Jailbreakable versions for iPhone 6: none"));
}

#[test]
fn test_check_json() {
    let dir = TempDir::new().unwrap();

    let assert = jb_cmd(dir.path())
        .args(["check", "iphone 14", "iOS 15.7", "--format", "json"])
        .assert()
        .success();
    let result = stdout_json(assert.get_output());

    assert_eq!(result["resolved_model"], "iPhone 14");
    assert_eq!(result["version"], "15.7");
    assert_eq!(result["jailbreakable"], false);
    assert_eq!(result["allowed"], serde_json::json!(["16.0-16.6.1", "17.0"]));
}

#[test]
fn test_check_compact_model_name() {
    let dir = TempDir::new().unwrap();

    let assert = jb_cmd(dir.path())
        .args(["check", "iPhone14Pro", "17.0", "--format", "json"])
        .assert()
        .success();
    let result = stdout_json(assert.get_output());

    assert_eq!(result["resolved_model"], "iPhone 14 Pro");
    assert_eq!(result["jailbreakable"], true);
}

#[test]
fn test_check_help_names_version_argument() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<MODEL> <VERSION>"));
}

#[test]
fn test_check_invalid_version_fails() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .args(["check", "iPhone 14", "sixteen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version argument"));
}

#[test]
fn test_models_table() {
    let dir = TempDir::new().unwrap();

    jb_cmd(dir.path())
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("Jailbreakable iOS: 16.0-16.6.1, 17.0"))
        .stdout(predicate::str::contains("iPhone 14 Pro Max"));
}

#[test]
fn test_models_json() {
    let dir = TempDir::new().unwrap();

    let assert = jb_cmd(dir.path())
        .args(["models", "--format", "json"])
        .assert()
        .success();
    let table = stdout_json(assert.get_output());

    let models = table["models"].as_array().unwrap();
    let iphone8 = models.iter().find(|m| m["model"] == "iPhone 8").unwrap();
    assert_eq!(iphone8["jailbreakable"], serde_json::json!(["16.0-16.6.1"]));

    let iphone7 = models.iter().find(|m| m["model"] == "iPhone 7").unwrap();
    assert_eq!(iphone7["jailbreakable"], serde_json::json!([]));
}
