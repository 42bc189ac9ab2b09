//! Core data types: domain records and service responses.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest selectable champion level.
pub const MIN_LEVEL: u8 = 1;
/// Highest selectable champion level.
pub const MAX_LEVEL: u8 = 18;

// === Stats ===

/// The base statistics shown on a champion page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Maximum health.
    Health,
    /// Health regenerated per 5 seconds.
    HealthRegen,
    /// Maximum mana.
    Mana,
    /// Mana regenerated per 5 seconds.
    ManaRegen,
    /// Armor.
    Armor,
    /// Magic resistance.
    MagicResist,
    /// Attack damage.
    AttackDamage,
    /// Attacks per second; grows by a percentage.
    AttackSpeed,
    /// Attack range in units.
    AttackRange,
    /// Movement speed in units per second.
    MovementSpeed,
}

impl StatKind {
    /// Every stat in display order.
    pub const ALL: [Self; 10] = [
        Self::Health,
        Self::HealthRegen,
        Self::Mana,
        Self::ManaRegen,
        Self::Armor,
        Self::MagicResist,
        Self::AttackDamage,
        Self::AttackSpeed,
        Self::AttackRange,
        Self::MovementSpeed,
    ];

    /// Stats a record cannot be complete without.
    pub const MANDATORY: [Self; 5] = [
        Self::Health,
        Self::Armor,
        Self::MagicResist,
        Self::AttackDamage,
        Self::MovementSpeed,
    ];

    /// Snake-case field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::HealthRegen => "health_regen",
            Self::Mana => "mana",
            Self::ManaRegen => "mana_regen",
            Self::Armor => "armor",
            Self::MagicResist => "magic_resist",
            Self::AttackDamage => "attack_damage",
            Self::AttackSpeed => "attack_speed",
            Self::AttackRange => "attack_range",
            Self::MovementSpeed => "movement_speed",
        }
    }

    /// Parse a snake-case field name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether growth for this stat is expressed as a percentage.
    #[must_use]
    pub const fn grows_by_percent(self) -> bool {
        matches!(self, Self::AttackSpeed)
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A base value with optional per-level growth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatValue {
    /// Value at level 1.
    pub base: f64,
    /// Growth per level, absent for flat stats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<f64>,
    /// Growth is a percentage of the base rather than an absolute amount.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub growth_percent: bool,
}

impl StatValue {
    /// A stat that does not grow.
    #[must_use]
    pub const fn flat(base: f64) -> Self {
        Self {
            base,
            growth: None,
            growth_percent: false,
        }
    }

    /// A stat that grows by a fixed amount per level.
    #[must_use]
    pub const fn growing(base: f64, growth: f64) -> Self {
        Self {
            base,
            growth: Some(growth),
            growth_percent: false,
        }
    }

    /// Value at `level` using the in-game growth curve.
    ///
    /// `base + growth * (n - 1) * (0.7025 + 0.0175 * (n - 1))`; percentage
    /// growth scales the base instead. Levels are clamped to 1..=18.
    ///
    /// ```rust
    /// use champwiki_core::StatValue;
    ///
    /// let health = StatValue::growing(590.0, 104.0);
    /// assert_eq!(health.at_level(1), 590.0);
    /// assert!((health.at_level(18) - (590.0 + 104.0 * 17.0)).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn at_level(&self, level: u8) -> f64 {
        let steps = f64::from(level.clamp(MIN_LEVEL, MAX_LEVEL) - 1);
        let factor = steps * 0.0175f64.mul_add(steps, 0.7025);
        match self.growth {
            None => self.base,
            Some(growth) if self.growth_percent => self.base * (growth / 100.0).mul_add(factor, 1.0),
            Some(growth) => growth.mul_add(factor, self.base),
        }
    }
}

/// Where per-level values in a [`LevelSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    /// Read from a per-level table in the static page.
    StaticTable,
    /// Read from the page after driving the level selector.
    Rendered,
    /// Derived from base and growth.
    Computed,
}

/// Stat values at one selected level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSnapshot {
    /// Selected level.
    pub level: u8,
    /// Where the values came from.
    pub source: LevelSource,
    /// Value per stat; stats that could not be determined are absent.
    pub values: BTreeMap<StatKind, f64>,
}

/// Base statistics of one champion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRecord {
    /// Champion title, as used on the wiki.
    pub champion: String,
    /// Known stats; a missing key means the value is unknown, never zero.
    pub stats: BTreeMap<StatKind, StatValue>,
    /// Values at the requested level, when one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelSnapshot>,
}

impl StatRecord {
    /// Value for `kind`, if known.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> Option<&StatValue> {
        self.stats.get(&kind)
    }

    /// Mandatory stats that are absent.
    #[must_use]
    pub fn missing_mandatory(&self) -> Vec<String> {
        StatKind::MANDATORY
            .into_iter()
            .filter(|kind| !self.stats.contains_key(kind))
            .map(|kind| kind.as_str().to_string())
            .collect()
    }
}

// === Abilities ===

/// The five ability slots, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilitySlot {
    /// Innate passive.
    Passive,
    /// First basic ability.
    Q,
    /// Second basic ability.
    W,
    /// Third basic ability.
    E,
    /// Ultimate.
    R,
}

impl AbilitySlot {
    /// Every slot in order.
    pub const ALL: [Self; 5] = [Self::Passive, Self::Q, Self::W, Self::E, Self::R];

    /// Lower-case slot key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::Q => "q",
            Self::W => "w",
            Self::E => "e",
            Self::R => "r",
        }
    }

    /// Label used in page headings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passive => "Passive",
            Self::Q => "Q",
            Self::W => "W",
            Self::E => "E",
            Self::R => "R",
        }
    }
}

impl fmt::Display for AbilitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRecord {
    /// Slot this ability occupies.
    pub slot: AbilitySlot,
    /// Ability name; mandatory for a complete set.
    pub name: Option<String>,
    /// Tooltip text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cooldown per rank, in seconds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cooldowns: Vec<f64>,
    /// Resource cost per rank.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<f64>,
}

impl AbilityRecord {
    /// An ability with nothing known but its slot.
    #[must_use]
    pub const fn empty(slot: AbilitySlot) -> Self {
        Self {
            slot,
            name: None,
            description: None,
            cooldowns: Vec::new(),
            costs: Vec::new(),
        }
    }
}

/// All five abilities of a champion, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitySet {
    /// Champion title.
    pub champion: String,
    /// One record per slot, passive first.
    pub abilities: Vec<AbilityRecord>,
}

impl AbilitySet {
    /// Ability in `slot`.
    #[must_use]
    pub fn slot(&self, slot: AbilitySlot) -> Option<&AbilityRecord> {
        self.abilities.iter().find(|a| a.slot == slot)
    }

    /// Slots without a name, as `<slot>.name` field identifiers.
    #[must_use]
    pub fn missing_mandatory(&self) -> Vec<String> {
        AbilitySlot::ALL
            .into_iter()
            .filter(|slot| self.slot(*slot).is_none_or(|a| a.name.is_none()))
            .map(|slot| format!("{slot}.name"))
            .collect()
    }
}

// === Patches ===

/// Changes shipped to a champion in one patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    /// Canonical version, e.g. `14.1` or `13.24b`.
    pub version: String,
    /// Individual change notes.
    pub changes: Vec<String>,
}

/// Patch history of one champion, newest first as listed on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchHistory {
    /// Champion title.
    pub champion: String,
    /// Patch entries.
    pub patches: Vec<PatchRecord>,
}

impl PatchHistory {
    /// `["patches"]` when empty.
    #[must_use]
    pub fn missing_mandatory(&self) -> Vec<String> {
        if self.patches.is_empty() {
            vec!["patches".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Any record the facade can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Record {
    /// Base statistics.
    Stats(StatRecord),
    /// Ability set.
    Abilities(AbilitySet),
    /// Patch history.
    Patches(PatchHistory),
}

// === Responses ===

/// Which path produced a response. Callers must match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Live (or fresh cached) data that passed validation.
    Primary,
    /// Live acquisition failed; data came from stale cache or the seed set.
    FallbackOnError,
    /// Live data was incomplete; data came from the seed set.
    FallbackOnIncomplete,
}

/// Where the returned bytes physically came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Fetched during this call.
    Network,
    /// Fresh cache entry.
    Cache,
    /// Cache entry past its TTL, used because the refresh failed.
    StaleCache,
    /// Built-in seed dataset.
    Seed,
}

/// How much to trust level-dependent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Values were read from a settled page.
    High,
    /// The page never settled; values are a best-effort snapshot.
    Low,
}

/// Terminal state of a service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Primary data with every mandatory field.
    Complete,
    /// Fallback data, or primary data with gaps.
    Degraded,
}

/// A record plus everything a caller needs to judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<R> {
    /// The record itself.
    pub record: R,
    /// Which path produced it.
    pub source: Source,
    /// Where its content came from.
    pub origin: Origin,
    /// Stability of level-dependent values.
    pub confidence: Confidence,
    /// Mandatory fields the record lacks.
    pub missing: Vec<String>,
    /// Validation problems found in live data.
    pub issues: Vec<String>,
    /// When the response was assembled.
    pub timestamp: DateTime<Utc>,
}

impl<R> ServiceResponse<R> {
    /// `Complete` only for primary data with nothing missing.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.source == Source::Primary && self.missing.is_empty() {
            Outcome::Complete
        } else {
            Outcome::Degraded
        }
    }

    /// Convert the record, keeping provenance.
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> ServiceResponse<T> {
        ServiceResponse {
            record: f(self.record),
            source: self.source,
            origin: self.origin,
            confidence: self.confidence,
            missing: self.missing,
            issues: self.issues,
            timestamp: self.timestamp,
        }
    }
}
