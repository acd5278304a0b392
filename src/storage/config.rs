//! Configuration handling for jbscrape
//!
//! Configuration is read from `--config PATH`, `$JBSCRAPE_CONFIG`, or
//! `config.toml` in the platform config directory
//! (`~/.config/jbscrape/config.toml` on Linux). A missing default file means
//! defaults; a missing explicit file is an error.
//!
//! ```toml
//! [search]
//! sites = ["ebay", "swappa"]
//! ebay_pages = 2
//! delay_secs = 1.5
//!
//! [report]
//! output = "jbscrape_results.json"
//! max_price = 400
//!
//! [notes]
//! enabled = true
//! backend = "markdown"
//! dir = "notes"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SourceSite;
use crate::sources::FetchSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
}

/// What to fetch and how politely
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub sites: Vec<SourceSite>,

    /// Result pages read per eBay query
    pub ebay_pages: u32,

    /// Pause between requests to the same site
    pub delay_secs: f64,

    pub swappa_max_listings_per_model: usize,

    pub timeout_secs: u64,

    /// Overrides the browser-like default user agent
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sites: vec![SourceSite::Ebay],
            ebay_pages: 2,
            delay_secs: 1.5,
            swappa_max_listings_per_model: 20,
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(self.timeout_secs),
            delay: Duration::from_secs_f64(self.delay_secs),
        }
    }
}

/// Where the report goes and how much of it is shown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output: PathBuf,

    /// Ceiling in major currency units; listings with unknown price are kept
    pub max_price: Option<f64>,

    /// Rows shown in the text summary across all models
    pub display_limit: usize,

    /// Rows shown per model in the text summary
    pub per_model_display: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("jbscrape_results.json"),
            max_price: None,
            display_limit: 30,
            per_model_display: 5,
        }
    }
}

/// Note destination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotesBackend {
    /// macOS Notes through `osascript`
    AppleNotes,
    /// A Markdown file with YAML frontmatter
    Markdown,
}

impl Default for NotesBackend {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            NotesBackend::AppleNotes
        } else {
            NotesBackend::Markdown
        }
    }
}

impl NotesBackend {
    pub fn as_str(&self) -> &str {
        match self {
            NotesBackend::AppleNotes => "apple_notes",
            NotesBackend::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub enabled: bool,
    pub backend: NotesBackend,
    pub title: String,

    /// Replace earlier notes of the same title
    pub overwrite: bool,

    /// Directory for the Markdown backend
    pub dir: PathBuf,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: NotesBackend::default(),
            title: "Jailbreakable iPhones".to_string(),
            overwrite: false,
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub report: ReportConfig,
    pub notes: NotesConfig,
}

impl Config {
    /// Loads configuration from `path`, or from the default location when None
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()).into());
                }
                Self::load_file(path)?
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "jbscrape", "jbscrape")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Rejects values no run could use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.sites.is_empty() {
            return Err(ConfigError::Invalid("search.sites must name at least one site".to_string()));
        }
        if self.search.ebay_pages == 0 {
            return Err(ConfigError::Invalid("search.ebay_pages must be at least 1".to_string()));
        }
        if !self.search.delay_secs.is_finite() || self.search.delay_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "search.delay_secs must be a non-negative number, got {}",
                self.search.delay_secs
            )));
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::Invalid("search.timeout_secs must be at least 1".to_string()));
        }
        if let Some(max) = self.report.max_price {
            if !max.is_finite() || max < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "report.max_price must be a non-negative amount, got {max}"
                )));
            }
        }
        if self.notes.title.trim().is_empty() {
            return Err(ConfigError::Invalid("notes.title must not be empty".to_string()));
        }
        Ok(())
    }

    /// Price ceiling in cents, if one is configured
    pub fn max_price_cents(&self) -> Option<u64> {
        self.report.max_price.map(|max| (max * 100.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.search.sites, vec![SourceSite::Ebay]);
        assert_eq!(config.search.ebay_pages, 2);
        assert_eq!(config.search.swappa_max_listings_per_model, 20);
        assert_eq!(config.report.output, PathBuf::from("jbscrape_results.json"));
        assert_eq!(config.report.per_model_display, 5);
        assert_eq!(config.report.display_limit, 30);
        assert!(!config.notes.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[search]
sites = ["ebay", "swappa"]
delay_secs = 0.5

[notes]
enabled = true
backend = "markdown"
dir = "notes"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.search.sites, vec![SourceSite::Ebay, SourceSite::Swappa]);
        assert_eq!(config.search.ebay_pages, 2);
        assert_eq!(config.search.fetch_settings().delay, Duration::from_millis(500));
        assert_eq!(config.notes.backend, NotesBackend::Markdown);
        assert_eq!(config.notes.dir, PathBuf::from("notes"));
        assert_eq!(config.notes.title, "Jailbreakable iPhones");
    }

    #[test]
    fn load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[report]\nmax_price = 399.99\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_price_cents(), Some(39999));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn unknown_site_fails_to_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[search]\nsites = [\"craigslist\"]\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = Config::default();
        config.search.ebay_pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.search.delay_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.max_price = Some(-5.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.sites.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_names() {
        assert_eq!(NotesBackend::AppleNotes.as_str(), "apple_notes");
        assert_eq!(NotesBackend::Markdown.as_str(), "markdown");
    }
}
