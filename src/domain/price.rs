//! Listing prices
//!
//! Marketplace prices arrive as display strings (`$1,234.56`, `US $150.00`,
//! `$150.00 to $200.00`). They are parsed leniently: the first amount wins and
//! anything unparseable becomes an unknown price rather than an error.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?").unwrap());

/// A price in minor units (cents) with an ISO currency code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
    currency: String,
}

impl Price {
    pub fn new(cents: u64, currency: impl Into<String>) -> Self {
        Self {
            cents,
            currency: currency.into(),
        }
    }

    /// Convenience constructor for whole US dollars
    pub fn usd(dollars: u64) -> Self {
        Self::new(dollars * 100, "USD")
    }

    /// Parses a marketplace price string, returning None when no amount is present
    pub fn parse(text: &str) -> Option<Self> {
        let caps = AMOUNT.captures(text)?;
        let whole = caps.get(0)?;
        let units: u64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
        let fraction: u64 = match caps.get(2) {
            Some(m) if m.as_str().len() == 1 => m.as_str().parse::<u64>().ok()? * 10,
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };

        let currency = currency_hint(&text[..whole.start()], &text[whole.end()..]);
        Some(Self::new(units.checked_mul(100)?.checked_add(fraction)?, currency))
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Amount in major units, for display and JSON output
    pub fn amount(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

fn currency_hint(before: &str, after: &str) -> &'static str {
    let before = before.to_uppercase();
    let after = after.to_uppercase();
    let tail = after.split_whitespace().next().unwrap_or("");

    if before.contains('£') || before.contains("GBP") || tail == "GBP" {
        "GBP"
    } else if before.contains('€') || before.contains("EUR") || tail == "EUR" {
        "EUR"
    } else if before.contains("C $") || before.contains("C$") || before.contains("CAD") || tail == "CAD" {
        "CAD"
    } else if before.contains("AU $") || before.contains("A$") || before.contains("AUD") || tail == "AUD" {
        "AUD"
    } else {
        "USD"
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.cents / 100;
        let fraction = self.cents % 100;
        match self.currency.as_str() {
            "USD" => write!(f, "${}.{:02}", units, fraction),
            "GBP" => write!(f, "£{}.{:02}", units, fraction),
            "EUR" => write!(f, "€{}.{:02}", units, fraction),
            code => write!(f, "{}.{:02} {}", units, fraction, code),
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Price::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid price: {raw}")))
    }
}

/// Deserializes an optional price, mapping anything malformed to None
///
/// Accepts a display string (`"$150.00"`), a bare number (treated as USD) or null.
pub fn lenient<'de, D>(deserializer: D) -> Result<Option<Price>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Price::parse(&s),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .map(|amount| Price::new((amount * 100.0).round() as u64, "USD")),
        _ => None,
    })
}
