//! Compiled selectors and patterns shared by the field sets.
//!
//! SAFETY: every pattern below is a compile-time constant known to be valid.
#![allow(clippy::unwrap_used)]

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

selector!(ANY_ID, "[id]");

// Stats
selector!(INFOBOX_ROW, ".infobox-data-row");
selector!(INFOBOX_LABEL, ".infobox-data-label");
selector!(INFOBOX_VALUE, ".infobox-data-value");
selector!(LEVEL_ROW, "tr[data-level]");
selector!(STAT_CELL, "td[data-stat]");
regex!(
    STAT_TEXT,
    r"(?i)\b(health regen|health|mana regen|mana|armor|magic resist(?:ance)?|attack damage|attack speed|attack range|move(?:ment)? speed)\b\s*:?\s*(\+?\d[\d,]*(?:\.\d+)?(?:\s*\(?\s*\+\s*\d[\d,]*(?:\.\d+)?\s*%?\s*\)?)?)"
);

// Numbers
regex!(
    STAT_NUMBER,
    r"^\s*(?P<base>\d[\d,]*(?:\.\d+)?)?\s*(?:\(\s*)?(?:\+\s*(?P<growth>\d[\d,]*(?:\.\d+)?)\s*(?P<pct>%)?)?"
);
regex!(PLAIN_NUMBER, r"\d[\d,]*(?:\.\d+)?");

// Abilities
selector!(ABILITY_NAME, ".ability-name");
selector!(ABILITY_DESCRIPTION, ".ability-description");
selector!(ABILITY_COOLDOWN, r#"[data-stat="cooldown"]"#);
selector!(ABILITY_COST, r#"[data-stat="cost"]"#);
selector!(SECTION_HEADING, "h2, h3, h4");
regex!(
    ABILITY_HEADING,
    r"^(?i)(passive|innate|q|w|e|r)\s*[-–—:]\s*(.+)$"
);
regex!(COOLDOWN_LINE, r"(?i)^cooldown\s*:\s*(.+)$");
regex!(COST_LINE, r"(?i)^cost\s*:\s*(.+)$");

// Patches
selector!(DEFINITION_LIST, "dl");
selector!(DEFINITION_TERM, "dt");
selector!(DEFINITION_DESC, "dd");
selector!(LIST_ITEM, "li");
regex!(VERSION, r"^(?i)v?\d+\.\d+[a-z]?$");
regex!(
    VERSION_LINE,
    r"^(?i)(v?\d+\.\d+[a-z]?)\s*[-–—:]\s*(.+)$"
);
regex!(CANONICAL_VERSION, r"^\d+\.\d+[a-z]?$");
