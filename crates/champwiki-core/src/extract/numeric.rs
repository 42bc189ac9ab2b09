//! Decoding of stat and per-rank number strings.
//!
//! Stat cells come in a handful of shapes:
//!
//! | Text            | base    | growth | percent |
//! |-----------------|---------|--------|---------|
//! | `64599+45`      | 64599   | 45     | no      |
//! | `590 (+104)`    | 590     | 104    | no      |
//! | `0.625 (+2.2%)` | 0.625   | 2.2    | yes     |
//! | `6450`          | 6450    | none   | no      |
//! | `+45`           | none    | 45     | no      |
//!
//! Growth is only recognized after a literal `+`.

use serde::{Deserialize, Serialize};

use super::selectors::{PLAIN_NUMBER, STAT_NUMBER};

/// A stat as read from the page, before validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStat {
    /// Level-1 value.
    pub base: Option<f64>,
    /// Per-level growth.
    pub growth: Option<f64>,
    /// Growth carried a trailing `%`.
    pub growth_percent: bool,
}

impl RawStat {
    /// Fill growth from `other` when this stat has none.
    #[must_use]
    pub const fn with_growth_from(mut self, other: Self) -> Self {
        if self.growth.is_none() {
            self.growth = other.growth;
            self.growth_percent = other.growth_percent;
        }
        self
    }
}

/// Parse a single number, ignoring thousands separators.
///
/// ```rust
/// use champwiki_core::extract::numeric::parse_number;
///
/// assert_eq!(parse_number("1,234.5"), Some(1234.5));
/// assert_eq!(parse_number("n/a"), None);
/// ```
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let found = PLAIN_NUMBER.find(text)?;
    found.as_str().replace(',', "").parse().ok()
}

/// Decode a stat cell into base and growth.
///
/// Returns `None` when the text starts with neither a number nor `+`.
///
/// ```rust
/// use champwiki_core::extract::numeric::decode_stat;
///
/// let stat = decode_stat("64599+45").unwrap();
/// assert_eq!(stat.base, Some(64599.0));
/// assert_eq!(stat.growth, Some(45.0));
///
/// let flat = decode_stat("6450").unwrap();
/// assert_eq!(flat.base, Some(6450.0));
/// assert_eq!(flat.growth, None);
/// ```
#[must_use]
pub fn decode_stat(text: &str) -> Option<RawStat> {
    let caps = STAT_NUMBER.captures(text)?;
    let number = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    };
    let base = number("base");
    let growth = number("growth");
    if base.is_none() && growth.is_none() {
        return None;
    }
    Some(RawStat {
        base,
        growth,
        growth_percent: growth.is_some() && caps.name("pct").is_some(),
    })
}

/// Decode a per-rank series such as `10 / 9 / 8 / 7 / 6`.
///
/// A single value yields a one-element series. Returns `None` if any
/// segment lacks a number (e.g. `No cost`).
#[must_use]
pub fn decode_series(text: &str) -> Option<Vec<f64>> {
    let values = text
        .split('/')
        .map(parse_number)
        .collect::<Option<Vec<_>>>()?;
    (!values.is_empty()).then_some(values)
}
