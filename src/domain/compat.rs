//! Device compatibility table
//!
//! Maps each iPhone model to the iOS versions it can actually run that are
//! also jailbreakable. A claim such as "iPhone 7 on iOS 16.5" is an
//! impossible combination: 16.5 is in the jailbreakable range, but the
//! iPhone 7 never received iOS 16.
//!
//! Jailbreakable ranges: iOS 16.0 through 16.6.1, and iOS 17.0 exactly.

use std::collections::HashMap;

use serde::Serialize;

use super::version::{IosVersion, VersionRange};

/// iOS versions with a known public jailbreak
pub const JAILBREAKABLE_RANGES: &[VersionRange] = &[
    VersionRange::new(IosVersion::new(16, 0, 0), IosVersion::new(16, 6, 1)),
    VersionRange::new(IosVersion::new(17, 0, 0), IosVersion::new(17, 0, 0)),
];

/// Which iOS releases a device shipped with and stopped at
#[derive(Debug, Clone, Copy)]
pub struct DeviceSupport {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Version the device shipped with
    pub first: IosVersion,
    /// Last major release the device received
    pub last_major: u16,
}

const fn device(
    name: &'static str,
    aliases: &'static [&'static str],
    first: (u16, u16),
    last_major: u16,
) -> DeviceSupport {
    DeviceSupport {
        name,
        aliases,
        first: IosVersion::new(first.0, first.1, 0),
        last_major,
    }
}

/// Every iPhone model, oldest first
pub const DEVICES: &[DeviceSupport] = &[
    device("iPhone 4", &[], (4, 0), 7),
    device("iPhone 4S", &[], (5, 0), 9),
    device("iPhone 5", &[], (6, 0), 10),
    device("iPhone 5C", &[], (7, 0), 10),
    device("iPhone 5S", &[], (7, 0), 12),
    device("iPhone 6", &[], (8, 0), 12),
    device("iPhone 6 Plus", &[], (8, 0), 12),
    device("iPhone 6S", &[], (9, 0), 15),
    device("iPhone 6S Plus", &[], (9, 0), 15),
    device(
        "iPhone SE",
        &["iphone se 1st gen", "iphone se 1st generation", "iphone se 2016"],
        (9, 3),
        15,
    ),
    device("iPhone 7", &[], (10, 0), 15),
    device("iPhone 7 Plus", &[], (10, 0), 15),
    device("iPhone 8", &[], (11, 0), 16),
    device("iPhone 8 Plus", &[], (11, 0), 16),
    device("iPhone X", &["iphone 10"], (11, 0), 16),
    device("iPhone XS", &[], (12, 0), 18),
    device("iPhone XS Max", &[], (12, 0), 18),
    device("iPhone XR", &[], (12, 0), 18),
    device("iPhone 11", &[], (13, 0), 26),
    device("iPhone 11 Pro", &[], (13, 0), 26),
    device("iPhone 11 Pro Max", &[], (13, 0), 26),
    device(
        "iPhone SE 2nd Gen",
        &[
            "iphone se 2",
            "iphone se 2nd",
            "iphone se 2020",
            "iphone se 2nd generation",
            "iphone se second generation",
        ],
        (13, 4),
        26,
    ),
    device("iPhone 12 Mini", &[], (14, 1), 26),
    device("iPhone 12", &[], (14, 1), 26),
    device("iPhone 12 Pro", &[], (14, 1), 26),
    device("iPhone 12 Pro Max", &[], (14, 1), 26),
    device("iPhone 13 Mini", &[], (15, 0), 26),
    device("iPhone 13", &[], (15, 0), 26),
    device("iPhone 13 Pro", &[], (15, 0), 26),
    device("iPhone 13 Pro Max", &[], (15, 0), 26),
    device(
        "iPhone SE 3rd Gen",
        &[
            "iphone se 3",
            "iphone se 3rd",
            "iphone se 2022",
            "iphone se 3rd generation",
            "iphone se third generation",
        ],
        (15, 4),
        26,
    ),
    device("iPhone 14", &[], (16, 0), 26),
    device("iPhone 14 Plus", &[], (16, 0), 26),
    device("iPhone 14 Pro", &[], (16, 0), 26),
    device("iPhone 14 Pro Max", &[], (16, 0), 26),
    device("iPhone 15", &[], (17, 0), 26),
    device("iPhone 15 Plus", &[], (17, 0), 26),
    device("iPhone 15 Pro", &[], (17, 0), 26),
    device("iPhone 15 Pro Max", &[], (17, 0), 26),
    device("iPhone 16e", &[], (18, 3), 26),
    device("iPhone 16", &[], (18, 0), 26),
    device("iPhone 16 Plus", &[], (18, 0), 26),
    device("iPhone 16 Pro", &[], (18, 0), 26),
    device("iPhone 16 Pro Max", &[], (18, 0), 26),
    device("iPhone 17", &[], (26, 0), 26),
    device("iPhone Air", &[], (26, 0), 26),
    device("iPhone 17 Pro", &[], (26, 0), 26),
    device("iPhone 17 Pro Max", &[], (26, 0), 26),
];

/// The jailbreakable versions one model can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityRule {
    pub model: &'static str,
    pub first_supported: IosVersion,
    pub last_major: u16,
    /// Empty when the model can run no jailbreakable version
    pub allowed: Vec<VersionRange>,
}

impl CompatibilityRule {
    fn new(device: &DeviceSupport, jailbreakable: &[VersionRange]) -> Self {
        let supported = VersionRange::new(device.first, IosVersion::last_of_major(device.last_major));
        let allowed = jailbreakable
            .iter()
            .filter_map(|range| range.intersect(&supported))
            .collect();

        Self {
            model: device.name,
            first_supported: device.first,
            last_major: device.last_major,
            allowed,
        }
    }

    /// Returns true if the device can run `version` and it is jailbreakable
    pub fn allows(&self, version: IosVersion) -> bool {
        self.allowed.iter().any(|range| range.contains(version))
    }

    /// Returns true if the device ever ran `version`, jailbreakable or not
    pub fn can_run(&self, version: IosVersion) -> bool {
        self.first_supported <= version && version.major <= self.last_major
    }
}

/// Immutable lookup from model name to [`CompatibilityRule`]
#[derive(Debug, Clone)]
pub struct CompatibilityTable {
    rules: Vec<CompatibilityRule>,
    ranges: Vec<VersionRange>,
    /// Normalized alias -> rule index
    by_alias: HashMap<String, usize>,
    /// (normalized alias, rule index), longest alias first
    matchers: Vec<(String, usize)>,
}

impl CompatibilityTable {
    /// Builds a table from device data and the jailbreakable ranges
    pub fn new(devices: &[DeviceSupport], jailbreakable: &[VersionRange]) -> Self {
        let rules: Vec<CompatibilityRule> = devices
            .iter()
            .map(|d| CompatibilityRule::new(d, jailbreakable))
            .collect();

        let mut by_alias = HashMap::new();
        let mut matchers = Vec::new();
        for (idx, device) in devices.iter().enumerate() {
            let names = std::iter::once(device.name).chain(device.aliases.iter().copied());
            for name in names {
                let key = normalize_model(name);
                by_alias.entry(key.clone()).or_insert(idx);
                matchers.push((key, idx));
            }
        }
        matchers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            rules,
            ranges: jailbreakable.to_vec(),
            by_alias,
            matchers,
        }
    }

    /// The built-in iPhone table
    pub fn standard() -> Self {
        Self::new(DEVICES, JAILBREAKABLE_RANGES)
    }

    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.rules
    }

    pub fn jailbreakable_ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    /// Looks up a model by its exact name or alias (case and punctuation insensitive)
    pub fn lookup(&self, model: &str) -> Option<&CompatibilityRule> {
        self.by_alias
            .get(&normalize_model(model))
            .map(|&idx| &self.rules[idx])
    }

    /// Finds the model named earliest in free text
    ///
    /// Matches respect word boundaries, so "iPhone 14" is never read as
    /// "iPhone 4" and "iPhone XS" never as "iPhone X". When two aliases start
    /// at the same position the longer one wins.
    pub fn infer_model(&self, text: &str) -> Option<&CompatibilityRule> {
        let haystack = normalize_model(text);
        let mut best: Option<(usize, usize)> = None;

        for (alias, idx) in &self.matchers {
            let Some(pos) = find_word(&haystack, alias) else {
                continue;
            };
            // matchers are longest first, so a tie keeps the longer alias
            if best.map_or(true, |(best_pos, _)| pos < best_pos) {
                best = Some((pos, *idx));
            }
        }

        best.map(|(_, idx)| &self.rules[idx])
    }

    /// Returns true iff `model` is known and can run the jailbreakable `version`
    pub fn is_jailbreakable(&self, model: &str, version: IosVersion) -> bool {
        self.lookup(model).is_some_and(|rule| rule.allows(version))
    }

    /// Returns true if `version` falls in any jailbreakable range, ignoring devices
    pub fn in_jailbreakable_range(&self, version: IosVersion) -> bool {
        self.ranges.iter().any(|range| range.contains(version))
    }
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Canonical form for model comparison: `Apple iPhone14-Pro+` -> `iphone 14 pro plus`
pub fn normalize_model(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for ch in text.to_lowercase().chars() {
        match ch {
            '+' => spaced.push_str(" plus "),
            c if c.is_alphanumeric() => {
                // digit/letter boundaries split words: iphone14pro, 6s, 3rd
                if prev.is_some_and(|p| p.is_ascii_digit() != c.is_ascii_digit()) {
                    spaced.push(' ');
                }
                spaced.push(c);
            }
            _ => spaced.push(' '),
        }
        prev = ch.is_alphanumeric().then_some(ch);
    }

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    if tokens.first() == Some(&"apple") {
        tokens.remove(0);
    }

    tokens.join(" ")
}

/// Position of `needle` in `haystack` bounded by non-alphanumerics on both sides
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before_ok = haystack[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[pos + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
