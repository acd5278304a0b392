//! iOS versions and version extraction from listing text
//!
//! Sellers write versions in many shapes: `iOS 16.5`, `iOS16`, `running 16.5.1`,
//! `iOS version is 16.2`. The extractor recognizes three forms:
//!
//! | Form | Example | Accepted majors |
//! |------|---------|-----------------|
//! | Anchored on `iOS` | `iOS 16.5`, `ios16`, `iOS: 17.0` | any |
//! | Cue word + dotted | `running 16.5.1`, `firmware 16.1` | 16, 17 |
//! | Dotted near `iOS` | `iOS version is 16.5.1` | 16, 17 |
//!
//! Storage sizes (`16GB`, `iOS 16.5GB`), prices (`$16.50`) and dotted numbers
//! embedded in longer dotted strings never match. An `iOS` token that already
//! carries its own number (`iOS 15.7`) does not vouch for a nearby bare one.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VersionError {
    #[error("Invalid iOS version: expected 'major[.minor[.patch]]', got '{0}'")]
    Invalid(String),
}

/// An iOS release number; a missing minor or patch component is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IosVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl IosVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The highest version within a major release
    pub const fn last_of_major(major: u16) -> Self {
        Self::new(major, u16::MAX, u16::MAX)
    }
}

impl fmt::Display for IosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl FromStr for IosVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .get(..3)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ios"))
            .map(|_| trimmed[3..].trim_start())
            .unwrap_or(trimmed);

        let parts: Vec<&str> = number.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(VersionError::Invalid(s.to_string()));
        }

        let mut components = [0u16; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(VersionError::Invalid(s.to_string()));
            }
            *slot = part
                .parse()
                .map_err(|_| VersionError::Invalid(s.to_string()))?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl TryFrom<String> for IosVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IosVersion> for String {
    fn from(version: IosVersion) -> Self {
        version.to_string()
    }
}

/// Inclusive range of iOS versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VersionRange {
    pub start: IosVersion,
    pub end: IosVersion,
}

impl VersionRange {
    pub const fn new(start: IosVersion, end: IosVersion) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, version: IosVersion) -> bool {
        self.start <= version && version <= self.end
    }

    /// Overlap of two ranges, or None when they are disjoint
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(VersionRange { start, end })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A version found in free text, with the byte span it was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionMention {
    pub version: IosVersion,
    pub span: Range<usize>,
    pub matched: String,
}

/// Majors accepted for un-anchored mentions (`running 16.5`)
const CUE_MAJORS: &[u16] = &[16, 17];

/// Words that introduce a bare version number
const CUE_WORDS: &[&str] = &["running", "runs", "run", "on", "firmware", "version", "ver"];

/// Units that turn a dotted number into a measurement
const UNIT_SUFFIXES: &[&str] = &["gb", "tb", "mb", "%", "\"", "inch", "inches", "mm", "mp"];

/// How many words around a bare version may separate it from `iOS`
const IOS_WINDOW: usize = 3;

static ANCHORED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bios[\s:\-]*v?(\d{1,2})(?:\.(\d{1,2}))?(?:\.(\d{1,2}))?\b").unwrap()
});
static BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})(?:\.(\d{1,2}))?\b").unwrap());

/// Returns every iOS version mentioned in `text`, in order of appearance
pub fn extract_versions(text: &str) -> Vec<VersionMention> {
    mentions(text).collect()
}

/// Lazily scans `text` for iOS version mentions
pub fn mentions(text: &str) -> Mentions<'_> {
    Mentions { text, pos: 0 }
}

/// Iterator over version mentions; each call to [`mentions`] starts afresh
#[derive(Debug, Clone)]
pub struct Mentions<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for Mentions<'_> {
    type Item = VersionMention;

    fn next(&mut self) -> Option<VersionMention> {
        while self.pos < self.text.len() {
            let anchored = ANCHORED.captures_at(self.text, self.pos);
            let bare = BARE.captures_at(self.text, self.pos);

            let anchored_first = match (&anchored, &bare) {
                (None, None) => {
                    self.pos = self.text.len();
                    return None;
                }
                (Some(a), Some(b)) => a.get(0)?.start() <= b.get(0)?.start(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
            };

            if anchored_first {
                let caps = anchored?;
                let whole = caps.get(0)?;
                self.pos = whole.end();
                if is_measurement(&self.text[whole.end()..]) {
                    continue;
                }
                if let Some(version) = version_from(&caps) {
                    return Some(VersionMention {
                        version,
                        span: whole.range(),
                        matched: whole.as_str().to_string(),
                    });
                }
            } else {
                let caps = bare?;
                let whole = caps.get(0)?;
                self.pos = whole.end();
                let Some(version) = version_from(&caps) else {
                    continue;
                };
                if accept_bare(self.text, whole.range(), version) {
                    return Some(VersionMention {
                        version,
                        span: whole.range(),
                        matched: whole.as_str().to_string(),
                    });
                }
            }
        }
        None
    }
}

fn version_from(caps: &Captures<'_>) -> Option<IosVersion> {
    let component = |i: usize| -> Option<u16> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let major = caps.get(1)?.as_str().parse().ok()?;
    Some(IosVersion::new(major, component(2)?, component(3)?))
}

/// Decides whether a dotted number outside an `iOS` token is a version
fn accept_bare(text: &str, span: Range<usize>, version: IosVersion) -> bool {
    let before = &text[..span.start];
    let after = &text[span.end..];

    if before.ends_with(['.', '$', '£', '€', '#']) || is_measurement(after) {
        return false;
    }
    if !CUE_MAJORS.contains(&version.major) {
        return false;
    }

    let cued = words(before)
        .next_back()
        .is_some_and(|w| CUE_WORDS.contains(&w.as_str()));
    if cued {
        return true;
    }

    let before_words: Vec<String> = words(before).collect();
    let after_words: Vec<String> = words(after).collect();
    let window_start = before_words.len().saturating_sub(IOS_WINDOW);
    (window_start..before_words.len()).any(|i| untagged_ios(&before_words, i))
        || (0..after_words.len().min(IOS_WINDOW)).any(|i| untagged_ios(&after_words, i))
}

/// True if the text right after a number makes it a size or a longer dotted string
fn is_measurement(after: &str) -> bool {
    let mut chars = after.chars();
    if chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return true;
    }
    if after.starts_with(['%', '"']) {
        return true;
    }
    words(after)
        .next()
        .is_some_and(|unit| UNIT_SUFFIXES.contains(&unit.as_str()))
}

/// An `iOS` word not followed by a number of its own
fn untagged_ios(tokens: &[String], i: usize) -> bool {
    tokens[i] == "ios"
        && !tokens
            .get(i + 1)
            .is_some_and(|next| next.trim_start_matches('v').starts_with(|c: char| c.is_ascii_digit()))
}

/// Lowercased words with surrounding punctuation trimmed
fn words(text: &str) -> impl DoubleEndedIterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '%' && c != '"')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}
